mod server;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use livecast_core::connector::{LiveConnector, MockConnector};
use livecast_core::{logging, Config};
use livecast_relay::RelayController;

use server::RelayServer;

/// Live-stream event fan-out relay
#[derive(Debug, Parser)]
#[command(name = "livecast", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "LIVECAST_CONFIG")]
    config: Option<String>,
}

/// Select the upstream connector implementation from configuration.
fn build_connector(config: &Config) -> Result<Arc<dyn LiveConnector>> {
    match config.upstream.provider.as_str() {
        "mock" => Ok(Arc::new(MockConnector::new())),
        other => anyhow::bail!("unknown upstream provider: {other}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging)?;

    info!("Livecast relay starting...");
    info!("Listen address: {}", config.listen_address());

    let connector = build_connector(&config)?;
    info!("Upstream provider: {}", connector.name());

    let controller = Arc::new(RelayController::new(connector));
    let server = RelayServer::new(config, controller);
    server.start().await
}
