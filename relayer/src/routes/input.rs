//! Encrypted input endpoints

use alloy_primitives::Bytes;
use axum::{extract::State, routing::post, Json, Router};
use relayer_sdk::crypto;
use relayer_sdk::types::{InputProofRequest, InputProofResponse};
use tracing::{info, instrument};

use crate::error::RelayerError;
use crate::state::AppState;

/// Create input routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/input-proof", post(input_proof))
}

/// Register a sealed plaintext and return its handle and input proof
/// POST /api/v1/input-proof
#[instrument(skip(state, request), fields(contract = %request.contract_address, user = %request.user_address))]
async fn input_proof(
    State(state): State<AppState>,
    Json(request): Json<InputProofRequest>,
) -> Result<Json<InputProofResponse>, RelayerError> {
    let contract = request.contract_address;
    let user = request.user_address;

    let opened = state
        .network_key()
        .open(&request.ciphertext, &crypto::input_aad(contract, user))
        .map_err(|e| RelayerError::InvalidInput(format!("cannot open input: {e}")))?;
    let value = crypto::decode_u64(&opened)
        .map_err(|e| RelayerError::InvalidInput(e.to_string()))?;

    let handle = state
        .devnet()
        .await
        .register_input(&request.ciphertext, contract, user, value);
    let proof = state
        .input_verifier()
        .sign_input(handle, contract, user, state.chain_id());

    state.increment_inputs();
    info!(%handle, "Input registered");

    Ok(Json(InputProofResponse {
        handle,
        input_proof: Bytes::copy_from_slice(&proof),
    }))
}
