//! Primary source: the vessel detail page
//!
//! The page carries identity as well as a position, so the tracker calls
//! [`PrimarySource::fetch_page`] directly and uses the page's candidate as
//! the primary input.

use async_trait::async_trait;
use reqwest::Client;

use vessel_core::{Imo, PositionCandidate, SourceName};
use vessel_net::{check_reachable, fetch_vessel_page, HttpConfig, NetError, VesselPage};

use crate::{PositionSource, SourceError, SourceQuery};

/// Vessel detail page scraper
pub struct PrimarySource {
    client: Client,
    http: HttpConfig,
}

impl PrimarySource {
    pub fn new(client: Client, http: HttpConfig) -> Self {
        Self { client, http }
    }

    /// Fetch the full page (identity, particulars and position)
    pub async fn fetch_page(&self, imo: &Imo) -> Result<VesselPage, NetError> {
        fetch_vessel_page(&self.client, &self.http, imo).await
    }

    /// Whether the detail site answers at all
    pub async fn check_reachable(&self) -> Result<bool, NetError> {
        check_reachable(&self.client, &self.http).await
    }
}

#[async_trait]
impl PositionSource for PrimarySource {
    fn name(&self) -> &str {
        "vesselfinder"
    }

    fn slot(&self) -> SourceName {
        SourceName::Primary
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Option<PositionCandidate>, SourceError> {
        let page = self.fetch_page(&query.imo).await?;
        Ok(page.candidate)
    }
}
