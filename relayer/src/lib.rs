// Library entry point for the relayer
// Exposes the router and services for integration tests

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;

pub use config::Config;
pub use error::RelayerError;
pub use state::AppState;

/// Router with every endpoint, without transport layers
pub fn app(state: AppState) -> Router {
    routes::create_routes(state)
}
