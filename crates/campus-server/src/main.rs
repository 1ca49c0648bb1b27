//! # campus-server
//!
//! Process host for the campus live hub.
//!
//! This binary provides:
//! - one **live hub** instance (presence, channel messages, typing,
//!   announcements, system stats) shared by every request
//! - a **stats refresher** that rebuilds the system stats snapshot on a
//!   fixed interval
//! - an **event logger** that follows the hub's event stream
//! - a **JSON API** (axum) for the student workspace and the admin
//!   live-control console

mod api;
mod config;
mod error;
mod simulator;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use campus_live::Hub;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,campus_server=debug,campus_live=debug")),
        )
        .init();

    info!("Starting campus live server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build the hub
    // -----------------------------------------------------------------------
    let hub = Arc::new(Hub::new(config.hub_config()));

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Event logger
    let mut events = hub.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(event = %event.kind(), "Hub event"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged behind the hub");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Stats refresher
    if config.simulate_stats {
        simulator::spawn(hub.clone(), config.stats_interval);
        info!(
            every_secs = config.stats_interval.as_secs(),
            "System stats refresher running"
        );
    }

    let app_state = AppState {
        hub,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
