//! Devnet endpoints: key material, contract addresses, transactions and reads

use std::str::FromStr;

use alloy_primitives::Address;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use relayer_sdk::types::{
    BalanceResponse, ContractsResponse, KeysResponse, NonceResponse, SalaryResponse,
    SignedTransaction, TransactionReceipt,
};
use tracing::{info, instrument};

use crate::error::RelayerError;
use crate::state::{unix_now, AppState};

/// Create chain routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/keys", get(keys))
        .route("/contracts", get(contracts))
        .route("/transactions", post(submit_transaction))
        .route("/accounts/:account/nonce", get(nonce))
        .route("/payroll/salary/:account", get(salary))
        .route("/token/balance/:account", get(balance))
}

fn parse_account(raw: &str) -> Result<Address, RelayerError> {
    Address::from_str(raw).map_err(|e| RelayerError::InvalidInput(format!("invalid account {raw}: {e}")))
}

/// GET /api/v1/keys
async fn keys(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(state.keys())
}

/// GET /api/v1/contracts
async fn contracts(State(state): State<AppState>) -> Json<ContractsResponse> {
    Json(state.devnet().await.contracts())
}

/// Execute a signed ledger transaction
/// POST /api/v1/transactions
#[instrument(skip(state, tx), fields(from = %tx.transaction.from, method = tx.transaction.method.as_str()))]
async fn submit_transaction(
    State(state): State<AppState>,
    Json(tx): Json<SignedTransaction>,
) -> Result<Json<TransactionReceipt>, RelayerError> {
    let receipt = state.devnet().await.transact(&tx, unix_now())?;
    info!(tx_hash = %receipt.tx_hash, events = receipt.events.len(), "Transaction executed");
    Ok(Json(receipt))
}

/// GET /api/v1/accounts/{account}/nonce
async fn nonce(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<NonceResponse>, RelayerError> {
    let account = parse_account(&account)?;
    let nonce = state.devnet().await.nonce(&account);
    Ok(Json(NonceResponse { account, nonce }))
}

/// `getSalary(account)`
/// GET /api/v1/payroll/salary/{account}
async fn salary(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<SalaryResponse>, RelayerError> {
    let account = parse_account(&account)?;
    let (pending, total) = state.devnet().await.salary(&account);
    Ok(Json(SalaryResponse {
        account,
        pending,
        total,
    }))
}

/// `confidentialBalanceOf(account)`
/// GET /api/v1/token/balance/{account}
async fn balance(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<BalanceResponse>, RelayerError> {
    let account = parse_account(&account)?;
    let balance = state.devnet().await.balance(&account);
    Ok(Json(BalanceResponse { account, balance }))
}
