//! Server lifecycle management
//!
//! Binds the subscriber WebSocket endpoint and runs until a shutdown signal
//! arrives.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use livecast_api::{router, AppState};
use livecast_core::Config;
use livecast_relay::RelayController;

/// Livecast server - owns the configuration and the relay controller
pub struct RelayServer {
    config: Config,
    controller: Arc<RelayController>,
}

impl RelayServer {
    #[must_use]
    pub const fn new(config: Config, controller: Arc<RelayController>) -> Self {
        Self { config, controller }
    }

    /// Start the server and wait for shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let state = AppState {
            controller: Arc::clone(&self.controller),
        };
        let app = router(state);

        let addr: SocketAddr = self.config.listen_address().parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("WebSocket relay listening on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received, stopping...");
}
