//! Live feed source
//!
//! Subscribes to the AIS stream for one MMSI and waits, bounded by a
//! timeout, for its next position report.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use vessel_core::{BoundingBox, PositionCandidate, SourceName};
use vessel_net::{next_position, Subscription};

use crate::{PositionSource, SourceError, SourceQuery};

/// Live feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveFeedConfig {
    pub enabled: bool,
    pub url: String,
    /// Stream API key; the source is skipped without one
    pub api_key: Option<String>,
    /// Longest wait for a matching message, in seconds
    pub timeout_secs: u64,
    /// Half-width of the subscription window around the anchor; the whole
    /// globe is used when no anchor is known
    pub pad_degrees: f64,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "wss://stream.aisstream.io/v0/stream".to_string(),
            api_key: None,
            timeout_secs: 15,
            pad_degrees: 2.0,
        }
    }
}

impl LiveFeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// AIS websocket stream
pub struct LiveFeedSource {
    config: LiveFeedConfig,
}

impl LiveFeedSource {
    pub fn new(config: LiveFeedConfig) -> Self {
        Self { config }
    }

    fn subscription(&self, api_key: &str, mmsi: &str, anchor: Option<(f64, f64)>) -> Subscription {
        let window = match anchor {
            Some((lat, lon)) => BoundingBox::around(lat, lon, self.config.pad_degrees),
            None => BoundingBox::globe(),
        };
        Subscription::positions(api_key, &window).for_vessel(mmsi)
    }
}

#[async_trait]
impl PositionSource for LiveFeedSource {
    fn name(&self) -> &str {
        "aisstream"
    }

    fn slot(&self) -> SourceName {
        SourceName::Tertiary
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Option<PositionCandidate>, SourceError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| SourceError::NotReady("no stream API key".to_string()))?;
        let mmsi = query.require_mmsi()?;

        let subscription = self.subscription(api_key, mmsi, query.anchor);
        let candidate =
            next_position(&self.config.url, &subscription, mmsi, self.config.timeout()).await?;
        Ok(Some(candidate))
    }
}
