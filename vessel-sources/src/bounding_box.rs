//! Bounding-box source
//!
//! Queries the nearby-vessels map around the primary fix and matches the
//! vessel by MMSI. Without an MMSI and an anchor there is nothing to ask.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use vessel_core::{BoundingBox, PositionCandidate, SourceName};
use vessel_net::{query_nearby, HttpConfig};

use crate::{PositionSource, SourceError, SourceQuery};

/// Bounding-box source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBoxConfig {
    pub enabled: bool,
    /// Half-width of the query window in degrees
    pub pad_degrees: f64,
}

impl Default for BoundingBoxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pad_degrees: 0.9,
        }
    }
}

/// Nearby-vessels map query
pub struct BoundingBoxSource {
    client: Client,
    http: HttpConfig,
    config: BoundingBoxConfig,
}

impl BoundingBoxSource {
    pub fn new(client: Client, http: HttpConfig, config: BoundingBoxConfig) -> Self {
        Self { client, http, config }
    }
}

#[async_trait]
impl PositionSource for BoundingBoxSource {
    fn name(&self) -> &str {
        "myshiptracking"
    }

    fn slot(&self) -> SourceName {
        SourceName::Secondary
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Option<PositionCandidate>, SourceError> {
        let mmsi = query.require_mmsi()?;
        let (lat, lon) = query
            .anchor
            .ok_or_else(|| SourceError::NotReady("no anchor position".to_string()))?;

        let window = BoundingBox::around(lat, lon, self.config.pad_degrees);
        Ok(query_nearby(&self.client, &self.http, mmsi, &window).await?)
    }
}
