//! HTTP API for the signing session relay.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;

use anyhow::Context;
use std::net::SocketAddr;
use tracing::info;

/// Binds the listener and serves the API until the task is aborted.
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("API server listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("API server error")?;
    Ok(())
}
