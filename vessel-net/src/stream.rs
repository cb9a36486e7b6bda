//! Live AIS websocket stream
//!
//! Connects, sends one subscription and waits for the first position report
//! from the requested vessel. The wait is a single bounded future.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use vessel_core::{BoundingBox, PositionCandidate, SourceName};

use crate::NetError;

/// Connected upstream AIS stream
pub type AisStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Subscription message, sent once right after connecting
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(rename = "APIKey")]
    pub api_key: String,
    #[serde(rename = "BoundingBoxes")]
    pub bounding_boxes: Vec<[[f64; 2]; 2]>,
    #[serde(rename = "FiltersShipMMSI", skip_serializing_if = "Vec::is_empty")]
    pub ship_mmsi: Vec<String>,
    #[serde(rename = "FilterMessageTypes")]
    pub message_types: Vec<String>,
}

impl Subscription {
    /// Position reports inside a window
    pub fn positions(api_key: &str, window: &BoundingBox) -> Self {
        Self {
            api_key: api_key.to_string(),
            bounding_boxes: vec![window.corners()],
            ship_mmsi: Vec::new(),
            message_types: vec!["PositionReport".to_string()],
        }
    }

    /// Restrict to one vessel
    pub fn for_vessel(mut self, mmsi: &str) -> Self {
        self.ship_mmsi = vec![mmsi.to_string()];
        self
    }
}

#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[serde(rename = "MessageType", default)]
    message_type: String,
    #[serde(rename = "MetaData", default)]
    meta: Option<MetaData>,
    #[serde(rename = "Message", default)]
    message: Option<MessageBody>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaData {
    #[serde(rename = "MMSI", default)]
    mmsi: Option<u64>,
    #[serde(default)]
    time_utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(rename = "PositionReport", default)]
    position_report: Option<PositionReport>,
}

#[derive(Debug, Deserialize)]
struct PositionReport {
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Sog", default)]
    sog: Option<f64>,
    #[serde(rename = "Cog", default)]
    cog: Option<f64>,
    #[serde(rename = "UserID", default)]
    user_id: Option<u64>,
}

/// AIS "not available" values for speed (102.3 kn) and course (360 deg)
const SOG_NOT_AVAILABLE: f64 = 102.3;
const COG_NOT_AVAILABLE: f64 = 360.0;

/// Decode one stream message, returning a candidate when it matches `mmsi`
pub fn decode_position_report(
    text: &str,
    mmsi: &str,
) -> Result<Option<PositionCandidate>, NetError> {
    let envelope: StreamEnvelope =
        serde_json::from_str(text).map_err(|e| NetError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(NetError::Upstream(error));
    }

    if envelope.message_type != "PositionReport" {
        return Ok(None);
    }

    let Some(report) = envelope.message.and_then(|m| m.position_report) else {
        return Ok(None);
    };

    let sender = report
        .user_id
        .or_else(|| envelope.meta.as_ref().and_then(|m| m.mmsi))
        .map(|id| id.to_string());
    if sender.as_deref() != Some(mmsi.trim()) {
        return Ok(None);
    }

    let sog = report.sog.filter(|v| *v < SOG_NOT_AVAILABLE);
    let cog = report.cog.filter(|v| *v < COG_NOT_AVAILABLE);

    let mut candidate =
        PositionCandidate::new(SourceName::Tertiary, report.latitude, report.longitude)
            .with_motion(sog, cog)
            .with_age(0);
    if let Some(time) = envelope.meta.and_then(|m| m.time_utc) {
        candidate = candidate.reported_at(time);
    }

    Ok(Some(candidate))
}

/// Connect and send the subscription
pub async fn open_stream(url: &str, subscription: &Subscription) -> Result<AisStream, NetError> {
    let (mut ws, _) = connect_async(url).await?;

    let payload =
        serde_json::to_string(subscription).map_err(|e| NetError::Malformed(e.to_string()))?;
    ws.send(Message::Text(payload)).await?;

    debug!("Subscribed to AIS stream at {}", url);
    Ok(ws)
}

/// Frame payload as text, for the frames that carry JSON
pub fn frame_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text),
        Message::Binary(bytes) => String::from_utf8(bytes).ok(),
        _ => None,
    }
}

/// Wait for the next position report from `mmsi`, bounded by `timeout`
pub async fn next_position(
    url: &str,
    subscription: &Subscription,
    mmsi: &str,
    timeout: Duration,
) -> Result<PositionCandidate, NetError> {
    tokio::time::timeout(timeout, wait_for_match(url, subscription, mmsi))
        .await
        .map_err(|_| NetError::Timeout(timeout.as_secs()))?
}

async fn wait_for_match(
    url: &str,
    subscription: &Subscription,
    mmsi: &str,
) -> Result<PositionCandidate, NetError> {
    let mut ws = open_stream(url, subscription).await?;

    while let Some(message) = ws.next().await {
        let message = message?;
        if message.is_close() {
            break;
        }
        let Some(text) = frame_text(message) else {
            continue;
        };

        match decode_position_report(&text, mmsi) {
            Ok(Some(candidate)) => {
                let _ = ws.close(None).await;
                return Ok(candidate);
            }
            Ok(None) => {}
            Err(NetError::Malformed(e)) => warn!("Skipping undecodable stream message: {}", e),
            Err(e) => return Err(e),
        }
    }

    Err(NetError::StreamClosed)
}
