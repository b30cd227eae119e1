//! Key generation routes

use crate::handlers::keygen;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(keygen::initiate))
        .route("/{session_id}/join", post(keygen::join))
        .route(
            "/{session_id}/messages",
            post(keygen::submit_messages).get(keygen::fetch_messages),
        )
        .route("/{session_id}/status", get(keygen::status))
}
