//! Health and status endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use relayer_sdk::types::{HealthResponse, StatusResponse};

use crate::state::AppState;

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
}

/// Health check endpoint
/// GET /health
async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

/// Detailed status endpoint
/// GET /status
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let transactions = state.devnet().await.transaction_count();

    let response = StatusResponse {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain_id: state.chain_id(),
        uptime_secs: state.uptime_secs(),
        inputs_registered: state.inputs_registered(),
        transactions,
        decryptions: state.decryptions(),
    };

    (StatusCode::OK, Json(response))
}
