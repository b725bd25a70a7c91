//! Shared application state for the status server.

use crate::status::StatusBoard;
use std::sync::Arc;
use tokio::sync::broadcast;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<StatusBoard>,
}

impl AppState {
    pub fn new(board: Arc<StatusBoard>) -> Self {
        Self { board }
    }

    /// Subscribe to per-cycle updates.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.board.subscribe()
    }
}
