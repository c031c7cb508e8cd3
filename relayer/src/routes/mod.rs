//! HTTP Routes for the Relayer
//!
//! Provides REST API endpoints for encrypted inputs, user decryption,
//! transactions and contract reads.

pub mod chain;
pub mod decrypt;
pub mod health;
pub mod input;

use axum::Router;

use crate::state::AppState;

/// Create all routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest(
            "/api/v1",
            Router::new()
                .merge(chain::routes())
                .merge(input::routes())
                .merge(decrypt::routes()),
        )
        .with_state(state)
}
