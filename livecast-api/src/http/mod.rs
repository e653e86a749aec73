use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use livecast_relay::RelayController;

pub mod ws;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RelayController>,
}

/// Build the relay router: the subscriber WebSocket endpoint plus a health
/// probe.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::websocket_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
