//! Status endpoint.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::server::state::AppState;
use crate::status::AgentStatus;

/// GET /api/status - Latest sample and delivery outcome.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<AgentStatus> {
    Json(state.board.current())
}
