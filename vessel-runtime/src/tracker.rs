//! Lookup coordinator
//!
//! One lookup runs in two stages:
//! - fetch the primary page (identity, MMSI and the primary fix)
//! - ask every other source concurrently, seeded by the page
//!
//! Then the reconciliation policy picks the reported position. The whole
//! lookup is bounded by the configured deadline.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use vessel_core::{reconcile, Candidates, CoreError, Imo, PolicyConfig, VesselReport};
use vessel_net::{build_client, NetError};
use vessel_sources::{
    BoundingBoxSource, LiveFeedSource, PositionSource, PrimarySource, SourceQuery,
};

use crate::TrackerConfig;

/// Errors surfaced to callers of [`Tracker::lookup`]
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Invalid IMO number. Must be 7 digits with valid checksum ({0})")]
    InvalidImo(#[from] CoreError),

    #[error("Vessel not found")]
    NotFound,

    #[error("Primary source unavailable: {0}")]
    Upstream(String),

    #[error("Lookup exceeded the {0} second deadline")]
    Deadline(u64),
}

/// Vessel lookup coordinator
pub struct Tracker {
    primary: PrimarySource,
    sources: Vec<Arc<dyn PositionSource>>,
    policy: PolicyConfig,
    total_deadline: Duration,
}

impl Tracker {
    /// Build the tracker and its enabled sources from configuration
    pub fn new(config: &TrackerConfig) -> Result<Self, NetError> {
        let client = build_client(&config.http)?;
        let primary = PrimarySource::new(client.clone(), config.http.clone());

        let mut sources: Vec<Arc<dyn PositionSource>> = Vec::new();

        if config.bounding_box.enabled {
            sources.push(Arc::new(BoundingBoxSource::new(
                client,
                config.http.clone(),
                config.bounding_box.clone(),
            )));
        }

        if config.live_feed.enabled && config.live_feed.api_key().is_some() {
            sources.push(Arc::new(LiveFeedSource::new(config.live_feed.clone())));
        } else if config.live_feed.enabled {
            info!("No stream API key configured; live feed disabled");
        }

        info!(
            "Tracker initialised with {} secondary sources",
            sources.len()
        );

        Ok(Self::with_sources(
            primary,
            sources,
            config.policy,
            config.total_deadline(),
        ))
    }

    /// Assemble a tracker from explicit parts
    pub fn with_sources(
        primary: PrimarySource,
        sources: Vec<Arc<dyn PositionSource>>,
        policy: PolicyConfig,
        total_deadline: Duration,
    ) -> Self {
        Self {
            primary,
            sources,
            policy,
            total_deadline,
        }
    }

    pub fn primary(&self) -> &PrimarySource {
        &self.primary
    }

    /// Validate the identifier and look the vessel up.
    ///
    /// Invalid identifiers are rejected before any network call.
    pub async fn lookup(&self, raw_imo: &str) -> Result<VesselReport, LookupError> {
        let imo = Imo::parse(raw_imo)?;
        let span = info_span!("lookup", imo = %imo, request_id = %Uuid::new_v4());
        self.lookup_imo(imo).instrument(span).await
    }

    async fn lookup_imo(&self, imo: Imo) -> Result<VesselReport, LookupError> {
        let started = Instant::now();
        let deadline_secs = self.total_deadline.as_secs();

        let fetch = self.primary.fetch_page(&imo);
        let page = match tokio::time::timeout(self.total_deadline, fetch).await {
            Err(_) => {
                warn!("Primary page did not answer within the deadline");
                return Err(LookupError::Deadline(deadline_secs));
            }
            Ok(Err(NetError::NotFound(_))) => {
                info!("Vessel not found on primary source");
                return Err(LookupError::NotFound);
            }
            Ok(Err(e)) => {
                warn!("Primary page request failed: {}", e);
                return Err(LookupError::Upstream(e.to_string()));
            }
            Ok(Ok(page)) => page,
        };

        let mut candidates = Candidates::default();
        if let Some(candidate) = page.candidate.clone() {
            candidates.insert(candidate);
        }

        let query = SourceQuery::from_page(&page);
        let remaining = self.total_deadline.saturating_sub(started.elapsed());
        // Each source gets its own timeout so one overrun drops only that source
        let pending = self.sources.iter().map(|source| {
            let query = &query;
            async move {
                match tokio::time::timeout(remaining, source.fetch_or_absent(query)).await {
                    Ok(candidate) => candidate,
                    Err(_) => {
                        warn!("{} ran past the lookup deadline", source.name());
                        None
                    }
                }
            }
        });

        for candidate in join_all(pending).await.into_iter().flatten() {
            candidates.insert(candidate);
        }

        let merged = reconcile(&candidates, &self.policy);
        if let Some(p) = &merged {
            info!(
                "Using {} position ({}, {}) [{:?}]",
                p.source, p.latitude, p.longitude, p.selection
            );
        }

        let report = VesselReport::found(page.record, merged, page.last_pos_utc);
        if !report.has_position() {
            warn!("No valid position found");
        }
        debug!("Lookup finished in {:?}", started.elapsed());

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vessel_core::{PositionCandidate, SourceName};
    use vessel_net::HttpConfig;
    use vessel_sources::SourceError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Source returning a fixed answer after an optional delay
    struct FixedSource {
        slot: SourceName,
        candidate: Option<PositionCandidate>,
        delay: Duration,
    }

    #[async_trait]
    impl PositionSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn slot(&self) -> SourceName {
            self.slot
        }

        async fn fetch(
            &self,
            query: &SourceQuery,
        ) -> Result<Option<PositionCandidate>, SourceError> {
            assert_eq!(query.mmsi.as_deref(), Some("353136000"));
            tokio::time::sleep(self.delay).await;
            Ok(self.candidate.clone())
        }
    }

    fn fixed(slot: SourceName, lat: f64, lon: f64) -> Arc<dyn PositionSource> {
        Arc::new(FixedSource {
            slot,
            candidate: Some(PositionCandidate::new(slot, lat, lon)),
            delay: Duration::ZERO,
        })
    }

    fn page(age: &str) -> String {
        format!(
            r#"<h1 class="title">EVER GIVEN</h1>
            <svg class="ttt1 info" data-title="{age}"></svg>
            <script>MMSI = 353136000</script>
            <div id="djson" data-json='{{"ship_lat":51.92,"ship_lon":4.47,"ship_sog":12.3,"ship_cog":245}}'></div>"#
        )
    }

    async fn primary_for(server: &MockServer, status: u16, body: String) -> PrimarySource {
        Mock::given(method("GET"))
            .and(path("/details/9811000"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;

        let http = HttpConfig {
            page_base_url: format!("{}/details", server.uri()),
            retry: vessel_net::RetryPolicy {
                max_attempts: 2,
                base_backoff_ms: 1,
                max_backoff_ms: 1,
            },
            ..Default::default()
        };
        PrimarySource::new(build_client(&http).unwrap(), http)
    }

    fn tracker(primary: PrimarySource, sources: Vec<Arc<dyn PositionSource>>) -> Tracker {
        Tracker::with_sources(primary, sources, PolicyConfig::default(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_invalid_imo_makes_no_request() {
        let server = MockServer::start().await;
        let primary = primary_for(&server, 200, page("1 min ago")).await;
        let t = tracker(primary, Vec::new());

        assert!(matches!(t.lookup("9811001").await, Err(LookupError::InvalidImo(_))));
        assert!(matches!(t.lookup("98110").await, Err(LookupError::InvalidImo(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primary_only() {
        let server = MockServer::start().await;
        let t = tracker(primary_for(&server, 200, page("1 min ago")).await, Vec::new());

        let report = t.lookup("9811000").await.unwrap();
        assert!(report.found);
        assert_eq!(report.ais_source, SourceName::Primary);
        assert_eq!(report.lat, Some(51.92));
        assert_eq!(report.sog, Some(12.3));
        assert_eq!(report.last_pos_utc.as_deref(), Some("1 min ago"));
    }

    #[tokio::test]
    async fn test_live_feed_wins_over_fresh_primary() {
        let server = MockServer::start().await;
        let t = tracker(
            primary_for(&server, 200, page("2 min ago")).await,
            vec![
                fixed(SourceName::Secondary, 51.92345, 4.47345),
                fixed(SourceName::Tertiary, 51.9, 4.4),
            ],
        );

        let report = t.lookup("9811000").await.unwrap();
        assert_eq!(report.ais_source, SourceName::Tertiary);
        assert_eq!((report.lat, report.lon), (Some(51.9), Some(4.4)));
        // Motion falls back to the primary
        assert_eq!(report.cog, Some(245.0));
    }

    #[tokio::test]
    async fn test_stale_primary_replaced_by_bbox() {
        let server = MockServer::start().await;
        let t = tracker(
            primary_for(&server, 200, page("2 hours ago")).await,
            vec![fixed(SourceName::Secondary, 51.9, 4.4)],
        );

        let report = t.lookup("9811000").await.unwrap();
        assert_eq!(report.ais_source, SourceName::Secondary);
    }

    #[tokio::test]
    async fn test_slow_source_cut_by_deadline() {
        let server = MockServer::start().await;
        let slow: Arc<dyn PositionSource> = Arc::new(FixedSource {
            slot: SourceName::Tertiary,
            candidate: Some(PositionCandidate::new(SourceName::Tertiary, 1.0, 1.0)),
            delay: Duration::from_secs(30),
        });
        let t = Tracker::with_sources(
            primary_for(&server, 200, page("1 min ago")).await,
            vec![slow],
            PolicyConfig::default(),
            Duration::from_millis(500),
        );

        let started = Instant::now();
        let report = t.lookup("9811000").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.ais_source, SourceName::Primary);
    }

    #[tokio::test]
    async fn test_slow_source_keeps_fast_results() {
        let server = MockServer::start().await;
        let fast: Arc<dyn PositionSource> = Arc::new(FixedSource {
            slot: SourceName::Secondary,
            candidate: Some(PositionCandidate::new(SourceName::Secondary, 1.5, 2.5)),
            delay: Duration::from_millis(10),
        });
        let slow: Arc<dyn PositionSource> = Arc::new(FixedSource {
            slot: SourceName::Tertiary,
            candidate: Some(PositionCandidate::new(SourceName::Tertiary, 1.0, 1.0)),
            delay: Duration::from_secs(30),
        });
        let t = Tracker::with_sources(
            primary_for(&server, 200, page("2 hours ago")).await,
            vec![fast, slow],
            PolicyConfig::default(),
            Duration::from_millis(500),
        );

        let report = t.lookup("9811000").await.unwrap();
        assert_eq!(report.ais_source, SourceName::Secondary);
        assert_eq!((report.lat, report.lon), (Some(1.5), Some(2.5)));
    }

    #[tokio::test]
    async fn test_no_position_still_reports_identity() {
        let server = MockServer::start().await;
        let body = r#"<h1 class="title">GHOST</h1><script>MMSI = 353136000</script>"#.to_string();
        let t = tracker(
            primary_for(&server, 200, body).await,
            vec![fixed(SourceName::Secondary, 95.0, 4.4)],
        );

        let report = t.lookup("9811000").await.unwrap();
        assert!(report.found);
        assert_eq!(report.vessel_name.as_deref(), Some("GHOST"));
        assert_eq!(report.ais_source, SourceName::None);
        assert!(!report.has_position());
    }

    #[tokio::test]
    async fn test_not_found_and_upstream_errors() {
        let server = MockServer::start().await;
        let t = tracker(primary_for(&server, 404, String::new()).await, Vec::new());
        assert!(matches!(t.lookup("9811000").await, Err(LookupError::NotFound)));

        let server = MockServer::start().await;
        let t = tracker(primary_for(&server, 503, String::new()).await, Vec::new());
        assert!(matches!(t.lookup("9811000").await, Err(LookupError::Upstream(_))));
    }

    #[test]
    fn test_new_skips_live_feed_without_key() {
        let t = Tracker::new(&TrackerConfig::default()).unwrap();
        assert_eq!(t.sources.len(), 1);

        let mut config = TrackerConfig::default();
        config.live_feed.api_key = Some("key".to_string());
        config.bounding_box.enabled = false;
        let t = Tracker::new(&config).unwrap();
        assert_eq!(t.sources.len(), 1);
        assert_eq!(t.sources[0].slot(), SourceName::Tertiary);
    }
}
