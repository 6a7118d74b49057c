//! # PrimeLink Relay
//!
//! WebSocket fan-out server for cross-process configuration sync.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Relay Server                                   │
//! │                                                                         │
//! │  Admin ───► ws://host:8787/sync ───► every other connected context     │
//! │                                                                         │
//! │  Config: sync.toml [relay] section, PRIMELINK_RELAY_PORT               │
//! │  Logs:   RUST_LOG (default "info,primelink=debug")                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use primelink_sync::{RelayServer, SyncConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,primelink=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting PrimeLink relay...");

    // Load configuration
    let config = SyncConfig::load_or_default(None);
    info!(addr = %config.relay.bind_address(), "Configuration loaded");

    let relay = RelayServer::new(config.relay).start().await?;
    info!(url = %relay.sync_url(), "Relay ready");

    shutdown_signal().await;
    relay.shutdown().await?;

    info!(relayed = relay.relayed_count(), "Relay shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
