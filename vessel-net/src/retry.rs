//! Bounded retry with capped exponential backoff

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::NetError;

/// Retry bounds for a single logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds
    pub base_backoff_ms: u64,
    /// Upper bound on any single delay in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 4_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let delay = self.base_backoff_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }

    /// Worst-case total sleep across all retries
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts.max(1)).map(|r| self.delay_for(r)).sum()
    }

    /// Send a request, retrying network errors, 429 and 5xx.
    ///
    /// `make` builds a fresh request for every attempt. The last response is
    /// returned as-is once attempts run out, so callers still see its status.
    pub async fn send<F>(&self, mut make: F) -> Result<Response, NetError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let last = attempt >= attempts;

            match make().send().await {
                Ok(resp) if !last && is_retryable(resp.status()) => {
                    debug!("Attempt {} got status {}, retrying", attempt, resp.status());
                }
                Ok(resp) => return Ok(resp),
                Err(e) if !last => {
                    debug!("Attempt {} failed: {}, retrying", attempt, e);
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
