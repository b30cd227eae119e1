//! Battle signing routes

use crate::handlers::battle;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{session_id}/init", post(battle::init))
        .route("/{session_id}/join", post(battle::join))
        .route("/{session_id}/message", post(battle::broadcast_message))
        .route("/{session_id}/signature", post(battle::submit_signature))
        .route("/{session_id}/status", get(battle::status))
        .route("/{session_id}/finalize", get(battle::finalize))
}
