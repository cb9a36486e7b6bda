//! HTTP API
//!
//! - `GET /vessel-full/:imo` merged vessel report
//! - `GET /ping` liveness
//! - `GET /ws/ais-stream` relay of the global AIS position stream

use axum::extract::ws::{Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use vessel_core::{BoundingBox, VesselReport};
use vessel_net::{frame_text, open_stream, Subscription};
use vessel_sources::LiveFeedConfig;

use crate::{LookupError, Tracker};

/// Shared server state
pub struct AppState {
    pub tracker: Tracker,
    pub live_feed: LiveFeedConfig,
}

impl AppState {
    pub fn new(tracker: Tracker, live_feed: LiveFeedConfig) -> Self {
        Self { tracker, live_feed }
    }
}

/// Build the router with all endpoints
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping))
        .route("/vessel-full/:imo", get(vessel_full))
        .route("/ws/ais-stream", get(ais_stream))
        .layer(cors)
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn start(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Vessel tracker API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn status_for(error: &LookupError) -> StatusCode {
    match error {
        LookupError::InvalidImo(_) => StatusCode::BAD_REQUEST,
        LookupError::NotFound => StatusCode::NOT_FOUND,
        LookupError::Upstream(_) => StatusCode::BAD_GATEWAY,
        LookupError::Deadline(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

async fn vessel_full(
    State(state): State<Arc<AppState>>,
    Path(imo): Path<String>,
) -> (StatusCode, Json<VesselReport>) {
    match state.tracker.lookup(&imo).await {
        Ok(report) => (StatusCode::OK, Json(report)),
        Err(e) => (status_for(&e), Json(VesselReport::not_found(&imo, e.to_string()))),
    }
}

async fn ais_stream(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    let Some(api_key) = state.live_feed.api_key().map(str::to_owned) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "AIS stream API key not configured" })),
        )
            .into_response();
    };
    let url = state.live_feed.url.clone();

    ws.on_upgrade(move |socket| relay(socket, url, api_key))
}

/// Forward upstream frames to the client until either side closes
async fn relay(mut client: WebSocket, url: String, api_key: String) {
    let subscription = Subscription::positions(&api_key, &BoundingBox::globe());

    let mut upstream = match open_stream(&url, &subscription).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("AIS relay could not open upstream: {}", e);
            let notice = json!({ "error": e.to_string() }).to_string();
            let _ = client.send(ClientMessage::Text(notice)).await;
            let _ = client.send(ClientMessage::Close(None)).await;
            return;
        }
    };
    info!("AIS relay client connected");

    loop {
        tokio::select! {
            frame = upstream.next() => match frame {
                Some(Ok(message)) if message.is_close() => break,
                Some(Ok(message)) => {
                    let Some(text) = frame_text(message) else { continue };
                    if client.send(ClientMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!("AIS relay upstream error: {}", e);
                    break;
                }
                None => break,
            },
            incoming = client.recv() => match incoming {
                Some(Ok(ClientMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = upstream.close(None).await;
    let _ = client.send(ClientMessage::Close(None)).await;
    debug!("AIS relay client disconnected");
}
