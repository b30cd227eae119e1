//! Shared application state for the API server

use relay_coordinator::Coordinator;
use std::sync::Arc;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Session coordination service backing every endpoint
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    /// Create new application state
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}
