//! HTTP client configuration
//!
//! Builds clients that look like a desktop browser, optionally routed
//! through a proxy.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::RetryPolicy;

/// Outbound HTTP configuration shared by every source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Vessel detail pages live at `{page_base_url}/{imo}`
    pub page_base_url: String,
    /// Nearby-vessels endpoint for bounding-box queries
    pub nearby_url: String,
    /// Referer sent with bounding-box queries
    pub nearby_referer: String,
    /// Fixed user agent; a browser agent is picked at random when unset
    pub user_agent: Option<String>,
    pub accept: String,
    pub accept_language: String,
    /// Optional proxy URL (http, https or socks5h)
    pub proxy: Option<String>,
    /// Detail page request timeout in seconds
    pub page_timeout_secs: u64,
    /// Bounding-box request timeout in seconds
    pub nearby_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            page_base_url: "https://www.vesselfinder.com/vessels/details".to_string(),
            nearby_url: "https://www.myshiptracking.com/requests/vesselsonmaptempTTT.php"
                .to_string(),
            nearby_referer: "https://www.myshiptracking.com/".to_string(),
            user_agent: None,
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            proxy: None,
            page_timeout_secs: 20,
            nearby_timeout_secs: 10,
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn nearby_timeout(&self) -> Duration {
        Duration::from_secs(self.nearby_timeout_secs)
    }

    pub fn page_url(&self, imo: &str) -> String {
        format!("{}/{}", self.page_base_url.trim_end_matches('/'), imo)
    }
}

/// Errors from source transport
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Stream closed before a matching message arrived")]
    StreamClosed,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create the shared HTTP client
///
/// Timeouts are set per request, since each source has its own.
pub fn build_client(config: &HttpConfig) -> Result<Client, NetError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_str(&config.accept).map_err(|e| NetError::ClientBuild(e.to_string()))?,
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|e| NetError::ClientBuild(e.to_string()))?,
    );

    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_string());

    let mut builder = Client::builder()
        .default_headers(headers)
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5));

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy).map_err(|e| NetError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| NetError::ClientBuild(e.to_string()))
}

/// Check whether the vessel detail site answers at all
pub async fn check_reachable(client: &Client, config: &HttpConfig) -> Result<bool, NetError> {
    let result = client
        .get(&config.page_base_url)
        .timeout(config.page_timeout())
        .send()
        .await;

    match result {
        // Any HTTP answer means the host is up; the bare base path may 404
        Ok(resp) => Ok(!resp.status().is_server_error()),
        Err(_) => Ok(false),
    }
}
