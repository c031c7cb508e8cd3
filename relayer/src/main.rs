//! # Confidential Payroll - Development Relayer
//!
//! Runs the whole confidential payroll stack in one process so clients can
//! be developed and tested without an FHE network.
//!
//! ## Features
//!
//! - Mock coprocessor with fhEVM handle layout and ACL rules
//! - Input proofs signed with Ed25519 and bound to (contract, account)
//! - KMS user decryption gated by EIP-712 signatures and validity windows
//! - Devnet hosting the payroll ledger and cUSDT with atomic transactions
//!
//! ## Usage
//!
//! ```bash
//! # Random development keys
//! cargo run -p fhevm-relayer
//!
//! # Fixed keys and port
//! RELAYER_PORT=4000 RELAYER_NETWORK_SECRET_KEY=... RELAYER_INPUT_VERIFIER_SECRET_KEY=... cargo run -p fhevm-relayer
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Detailed server status
//! - `GET /api/v1/keys` - Network and verifier keys
//! - `GET /api/v1/contracts` - Deployed contract addresses
//! - `POST /api/v1/input-proof` - Register an encrypted input
//! - `POST /api/v1/user-decrypt` - Re-encrypt handles for their owner
//! - `POST /api/v1/transactions` - Submit a signed ledger transaction
//! - `GET /api/v1/accounts/{account}/nonce` - Next transaction nonce
//! - `GET /api/v1/payroll/salary/{account}` - Pending and total salary handles
//! - `GET /api/v1/token/balance/{account}` - cUSDT balance handle

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fhevm_relayer::{app, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        chain_id = config.chain_id,
        "Starting confidential payroll relayer"
    );

    if config.network_secret_key.is_none() || config.input_verifier_secret_key.is_none() {
        warn!("Using generated development keys; handles will not survive a restart");
    }

    // Create application state
    let state = AppState::from_config(&config)?;
    info!(
        network_key = %state.keys().network_public_key,
        input_verifier = %state.keys().input_verifier_key,
        "Keys initialized"
    );

    // Build router
    let app = app(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.socket_addr()?;
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build CORS layer from the configured origins
fn cors_layer(config: &Config) -> CorsLayer {
    let origins = if config.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(origins)
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    }
}
