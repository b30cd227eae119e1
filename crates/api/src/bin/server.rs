//! Signing session relay server
//!
//! In-memory rendezvous service for threshold signing parties. Serves the
//! key generation, signing and battle signing endpoints and sweeps idle
//! sessions in the background.

use anyhow::Result;
use relay_api::{start_server, AppState};
use relay_coordinator::{Coordinator, CoordinatorConfig, TtlSweeperBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting signing session relay server");

    // Load configuration from environment
    let config = load_config()?;
    let addr: SocketAddr = config.listen_addr.parse()?;

    info!("Server configuration:");
    info!("  Listen Address: {}", addr);
    info!("  Session TTL: {:?}", config.coordinator.session_ttl);
    info!("  Sweep Interval: {:?}", config.coordinator.sweep_interval);
    info!("  Battle Grace Period: {:?}", config.coordinator.battle_grace_period);

    let coordinator = Arc::new(Coordinator::new(config.coordinator));
    let state = AppState::new(Arc::clone(&coordinator));

    // Start the idle-session sweeper
    let sweeper = TtlSweeperBuilder::new()
        .with_coordinator(Arc::clone(&coordinator))
        .build()?;
    let sweeper_handle = Arc::clone(&sweeper).start();
    info!("Session sweeper started");

    // Start the API server in a separate task
    info!("API server starting on {}", addr);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(state, addr).await {
            error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    info!("Server running. Press Ctrl+C to shutdown.");
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    // Graceful shutdown
    sweeper.shutdown().await;
    let shutdown_timeout = Duration::from_secs(10);
    tokio::select! {
        _ = sweeper_handle => info!("Session sweeper stopped"),
        _ = tokio::time::sleep(shutdown_timeout) => info!("Session sweeper shutdown timed out"),
    }

    server_handle.abort();
    info!("API server stopped");

    info!("Shutdown complete");
    Ok(())
}

#[derive(Debug)]
struct Config {
    listen_addr: String,
    coordinator: CoordinatorConfig,
}

fn load_config() -> Result<Config> {
    let listen_addr = std::env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let session_ttl = env_secs("SESSION_TTL_SECS")?;
    let sweep_interval = env_secs("SWEEP_INTERVAL_SECS")?;
    let battle_grace = env_secs("BATTLE_GRACE_SECS")?;

    let mut builder = CoordinatorConfig::builder();
    if let Some(ttl) = session_ttl {
        builder = builder.session_ttl(ttl);
    }
    if let Some(interval) = sweep_interval {
        builder = builder.sweep_interval(interval);
    }
    if let Some(grace) = battle_grace {
        builder = builder.battle_grace_period(grace);
    }

    Ok(Config {
        listen_addr,
        coordinator: builder.build(),
    })
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(value) => {
            let secs = value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("{} must be an integer number of seconds", name))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}
