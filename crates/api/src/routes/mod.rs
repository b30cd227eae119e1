//! Route definitions for the relay API

pub mod battle;
pub mod keygen;
pub mod signing;

use crate::state::AppState;
use axum::Router;

/// Assembles the complete API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/keygen", keygen::routes())
        .nest("/sign", signing::routes())
        .nest("/battle", battle::routes())
        .with_state(state)
}
