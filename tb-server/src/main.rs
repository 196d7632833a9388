//! TrackBridge Server
//!
//! Follows race-tracker feeds for routed vehicles and relays their fixes
//! to a telemetry ingestion server.

use anyhow::Result;
use tb_server::{config::Config, poller, state::AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting TrackBridge");

    let config = Config::from_env()?;
    info!(
        "registry {} -> ingestion {}",
        config.registry_url, config.ingest_url
    );

    let state = AppState::new();
    tokio::spawn(poller::run(state, config));

    tokio::signal::ctrl_c().await?;
    info!("Exiting");

    Ok(())
}
