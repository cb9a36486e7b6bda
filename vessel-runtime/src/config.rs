//! Tracker configuration
//!
//! Every endpoint, header, timeout and threshold lives here and is handed to
//! the sources explicitly. Values come from defaults, an optional TOML file,
//! then command-line overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use vessel_core::PolicyConfig;
use vessel_net::HttpConfig;
use vessel_sources::{BoundingBoxConfig, LiveFeedConfig};

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub http: HttpConfig,
    pub bounding_box: BoundingBoxConfig,
    pub live_feed: LiveFeedConfig,
    pub policy: PolicyConfig,
    /// Hard upper bound on one lookup, in seconds
    pub total_deadline_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            bounding_box: BoundingBoxConfig::default(),
            live_feed: LiveFeedConfig::default(),
            policy: PolicyConfig::default(),
            total_deadline_secs: 45,
        }
    }
}

impl TrackerConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn total_deadline(&self) -> Duration {
        Duration::from_secs(self.total_deadline_secs)
    }

    /// Longest the primary page fetch can take with every retry used
    pub fn worst_case_page_fetch(&self) -> Duration {
        let retry = &self.http.retry;
        self.http.page_timeout() * retry.max_attempts.max(1) + retry.total_backoff()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_deadline_secs == 0 {
            return Err(ConfigError::Invalid("total_deadline_secs must be positive".to_string()));
        }
        if self.http.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "http.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.http.retry.base_backoff_ms > self.http.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "http.retry.base_backoff_ms exceeds max_backoff_ms".to_string(),
            ));
        }
        let pad = self.bounding_box.pad_degrees;
        if !pad.is_finite() || pad <= 0.0 {
            return Err(ConfigError::Invalid(
                "bounding_box.pad_degrees must be positive".to_string(),
            ));
        }

        let worst = self.worst_case_page_fetch();
        if worst > self.total_deadline() {
            info!(
                "Page retries can take {:?}, longer than the {}s lookup deadline",
                worst, self.total_deadline_secs
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.total_deadline_secs, 45);
        assert_eq!(config.policy.staleness_threshold_minutes, 60);
        assert_eq!(config.policy.freshness_floor_minutes, 5);
        assert!(config.live_feed.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TrackerConfig::from_toml(
            r#"
            total_deadline_secs = 30

            [policy]
            staleness_threshold_minutes = 90

            [http.retry]
            max_attempts = 2

            [live_feed]
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.total_deadline_secs, 30);
        assert_eq!(config.policy.staleness_threshold_minutes, 90);
        assert_eq!(config.policy.freshness_floor_minutes, 5);
        assert_eq!(config.http.retry.max_attempts, 2);
        assert_eq!(config.http.retry.base_backoff_ms, 500);
        assert_eq!(config.live_feed.api_key(), Some("secret"));
        assert_eq!(config.live_feed.timeout_secs, 15);
    }

    #[test]
    fn test_worst_case_page_fetch() {
        // 3 x 20 s attempts plus 0.5 s + 1 s of backoff
        let config = TrackerConfig::default();
        assert_eq!(config.worst_case_page_fetch(), Duration::from_millis(61_500));
        assert!(config.worst_case_page_fetch() > config.total_deadline());
        assert!(config.validate().is_ok());

        let config = TrackerConfig::from_toml(
            r#"
            [http]
            page_timeout_secs = 10

            [http.retry]
            max_attempts = 2
            base_backoff_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.worst_case_page_fetch(), Duration::from_secs(21));
        assert!(config.worst_case_page_fetch() < config.total_deadline());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            TrackerConfig::from_toml("total_deadline_secs = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TrackerConfig::from_toml("[http.retry]\nmax_attempts = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TrackerConfig::from_toml("total_deadline_secs = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
