//! Loopback HTTP server for the local status indicator.
//!
//! Exposes the latest sample and delivery outcome over REST and pushes
//! every cycle to WebSocket clients.

pub mod routes;
pub mod state;
pub mod ws;

use crate::server::routes::{health, status};
use crate::server::state::AppState;
use crate::server::ws::ws_handler;
use crate::status::StatusBoard;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

/// Builds the router over a status board.
pub fn router(board: Arc<StatusBoard>) -> Router {
    let state = Arc::new(AppState::new(board));

    // Dashboards are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/status", get(status::get_status))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Binds `127.0.0.1:port` and serves on a background task.
///
/// Binding happens before this returns, so a taken port is reported to
/// the caller instead of failing later in the background.
pub async fn start_server(
    port: u16,
    board: Arc<StatusBoard>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;
    let addr = listener.local_addr()?;
    let app = router(board);

    tracing::info!("Status server listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Status server stopped");
        }
    });

    Ok((addr, handle))
}
