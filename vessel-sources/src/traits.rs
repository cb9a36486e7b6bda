//! Common traits for position sources

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use vessel_core::{Imo, PositionCandidate, SourceName};
use vessel_net::{NetError, VesselPage};

/// Errors from source adapters
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] NetError),

    #[error("Source not ready: {0}")]
    NotReady(String),
}

/// What is known about a vessel when the sources are asked
#[derive(Debug, Clone)]
pub struct SourceQuery {
    pub imo: Imo,
    pub mmsi: Option<String>,
    /// Last known (latitude, longitude), used to centre window queries
    pub anchor: Option<(f64, f64)>,
}

impl SourceQuery {
    pub fn new(imo: Imo) -> Self {
        Self {
            imo,
            mmsi: None,
            anchor: None,
        }
    }

    pub fn with_mmsi(mut self, mmsi: &str) -> Self {
        self.mmsi = Some(mmsi.to_string());
        self
    }

    pub fn with_anchor(mut self, latitude: f64, longitude: f64) -> Self {
        self.anchor = Some((latitude, longitude));
        self
    }

    /// Seed a query from the primary page; anchors only on a usable fix
    pub fn from_page(page: &VesselPage) -> Self {
        Self {
            imo: page.record.imo.clone(),
            mmsi: page.record.mmsi.clone(),
            anchor: page
                .candidate
                .as_ref()
                .filter(|c| c.is_valid())
                .map(|c| (c.latitude, c.longitude)),
        }
    }

    pub(crate) fn require_mmsi(&self) -> Result<&str, SourceError> {
        self.mmsi
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| SourceError::NotReady("no MMSI known".to_string()))
    }
}

/// Common interface for all position sources
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Slot this source fills in reconciliation
    fn slot(&self) -> SourceName;

    /// Produce a candidate, `Ok(None)` when the vessel is not listed
    async fn fetch(&self, query: &SourceQuery) -> Result<Option<PositionCandidate>, SourceError>;

    /// Like `fetch`, with every failure logged and turned into absence
    async fn fetch_or_absent(&self, query: &SourceQuery) -> Option<PositionCandidate> {
        match self.fetch(query).await {
            Ok(Some(mut candidate)) => {
                candidate.source = self.slot();
                debug!(
                    "{} reported ({}, {}) for IMO {}",
                    self.name(),
                    candidate.latitude,
                    candidate.longitude,
                    query.imo
                );
                Some(candidate)
            }
            Ok(None) => {
                debug!("{} has no position for IMO {}", self.name(), query.imo);
                None
            }
            Err(SourceError::NotReady(reason)) => {
                debug!("{} skipped for IMO {}: {}", self.name(), query.imo, reason);
                None
            }
            Err(e) => {
                warn!("{} failed for IMO {}: {}", self.name(), query.imo, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl PositionSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn slot(&self) -> SourceName {
            SourceName::Secondary
        }

        async fn fetch(
            &self,
            _query: &SourceQuery,
        ) -> Result<Option<PositionCandidate>, SourceError> {
            Err(SourceError::Network(NetError::Timeout(10)))
        }
    }

    struct Mislabelled;

    #[async_trait]
    impl PositionSource for Mislabelled {
        fn name(&self) -> &str {
            "mislabelled"
        }

        fn slot(&self) -> SourceName {
            SourceName::Tertiary
        }

        async fn fetch(
            &self,
            _query: &SourceQuery,
        ) -> Result<Option<PositionCandidate>, SourceError> {
            Ok(Some(PositionCandidate::new(SourceName::Primary, 1.0, 2.0)))
        }
    }

    fn query() -> SourceQuery {
        SourceQuery::new(Imo::parse("9074729").unwrap())
    }

    #[tokio::test]
    async fn test_errors_become_absence() {
        assert!(Failing.fetch_or_absent(&query()).await.is_none());
    }

    #[tokio::test]
    async fn test_candidate_is_tagged_with_slot() {
        let c = Mislabelled.fetch_or_absent(&query()).await.unwrap();
        assert_eq!(c.source, SourceName::Tertiary);
    }

    #[test]
    fn test_require_mmsi() {
        assert!(matches!(query().require_mmsi(), Err(SourceError::NotReady(_))));
        assert!(matches!(query().with_mmsi(" ").require_mmsi(), Err(SourceError::NotReady(_))));
        assert_eq!(query().with_mmsi("353136000").require_mmsi().unwrap(), "353136000");
    }

    #[test]
    fn test_from_page_skips_invalid_anchor() {
        let mut record = vessel_core::VesselRecord::placeholder(Imo::parse("9074729").unwrap());
        record.mmsi = Some("353136000".to_string());
        let page = VesselPage {
            record,
            candidate: Some(PositionCandidate::new(SourceName::Primary, 120.0, 4.0)),
            last_pos_utc: None,
        };
        let q = SourceQuery::from_page(&page);
        assert_eq!(q.mmsi.as_deref(), Some("353136000"));
        assert!(q.anchor.is_none());
    }
}
