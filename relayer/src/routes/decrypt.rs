//! User decryption endpoint

use axum::{extract::State, routing::post, Json, Router};
use relayer_sdk::types::{UserDecryptRequest, UserDecryptResponse};
use tracing::instrument;

use crate::error::RelayerError;
use crate::services::kms;
use crate::state::{unix_now, AppState};

/// Create decryption routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/user-decrypt", post(user_decrypt))
}

/// Re-encrypt handles to the requester's viewer key
/// POST /api/v1/user-decrypt
#[instrument(skip(state, request), fields(user = %request.user_address, handles = request.handle_contract_pairs.len()))]
async fn user_decrypt(
    State(state): State<AppState>,
    Json(request): Json<UserDecryptRequest>,
) -> Result<Json<UserDecryptResponse>, RelayerError> {
    let response = {
        let devnet = state.devnet().await;
        kms::user_decrypt(state.decryption_domain(), devnet.coprocessor(), &request, unix_now())?
    };

    state.increment_decryptions();
    Ok(Json(response))
}
