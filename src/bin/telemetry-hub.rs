//! Telemetry Hub Application
//!
//! Receives sensor reports over UDP and serves them over HTTP.
//!
//! Usage: `telemetry-hub [config.toml]`

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_vote_hub::{
    config::AppConfig,
    network::UdpIngress,
    ui::{AppState, WebServer},
    TelemetryService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LAN Vote Hub");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    let service = Arc::new(TelemetryService::new(&config));

    // Both sockets are bound before anything runs, so a port conflict aborts startup
    let ingress = UdpIngress::bind(&config.network, service.clone())?;
    let web_server = WebServer::new(
        config.ui.clone(),
        AppState::new(service.clone(), ingress.stats()),
    );
    let listener = web_server.bind().await?;

    tracing::info!(
        "History {} samples/device, offline after {}s, vote window {}s",
        config.store.history_max,
        config.store.expiry_secs,
        config.stats.default_window_secs
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingress_handle = tokio::spawn(ingress.run(shutdown_rx.clone()));
    let web_handle = tokio::spawn(web_server.serve(listener, shutdown_rx));

    tracing::info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    // Live streams never finish on their own; end them so the server can drain
    service.hub().close_all();

    ingress_handle.await?;
    web_handle.await?.context("HTTP server failed")?;

    tracing::info!("Bye");
    Ok(())
}
