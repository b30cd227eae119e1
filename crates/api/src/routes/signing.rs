//! Signing session routes

use crate::handlers::signing;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(signing::initiate))
        .route("/{session_id}/join", post(signing::join))
        .route(
            "/{session_id}/messages",
            post(signing::submit_messages).get(signing::fetch_messages),
        )
        .route("/{session_id}/status", get(signing::status))
        .route("/{session_id}/broadcast", post(signing::broadcast_transaction))
        .route(
            "/{session_id}/transaction",
            post(signing::broadcast_transaction).get(signing::transaction),
        )
        .route("/{session_id}/finalize", post(signing::finalize))
}
