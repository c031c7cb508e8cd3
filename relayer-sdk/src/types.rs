//! Wire types shared by the relayer and its clients
//!
//! All request/response bodies, transaction payloads and error codes.
//! JSON fields are camelCase; byte strings and handles are `0x` hex.

use alloy_primitives::{Address, Bytes, B256};
use fhevm_host::Handle;
use serde::{Deserialize, Serialize};

/// Error codes returned by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request or plaintext
    InvalidInput,
    /// Input proof does not bind the handle to (contract, account)
    ProofInvalid,
    /// Caller is not permitted to perform the call
    Unauthorized,
    /// ACL does not grant the requester a handle
    GrantMissing,
    /// Decryption window is closed or not yet open
    AuthorizationExpired,
    /// Signature does not recover to the claimed account
    SignatureRejected,
    /// Transaction nonce does not match the account's next nonce
    InvalidNonce,
    /// Contract call failed; state unchanged
    TransactionReverted,
    /// Unknown contract or route
    NotFound,
    /// Internal server error
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    /// Offending handle, when the failure concerns a single one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            handle: None,
        }
    }

    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }
}

// ==================== Server Info ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub chain_id: u64,
    pub uptime_secs: u64,
    /// Handles registered through the input endpoint
    pub inputs_registered: u64,
    pub transactions: u64,
    pub decryptions: u64,
}

/// Public key material a client needs before encrypting or decrypting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResponse {
    pub chain_id: u64,
    /// X25519 key inputs are sealed to
    pub network_public_key: B256,
    /// Ed25519 key that signs input proofs
    pub input_verifier_key: B256,
    /// `verifyingContract` of the decryption EIP-712 domain
    pub decryption_verifier: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractsResponse {
    pub payroll: Address,
    pub token: Address,
    pub deployer: Address,
}

// ==================== Inputs ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProofRequest {
    pub contract_address: Address,
    pub user_address: Address,
    /// Plaintext sealed to the network key (see [`crate::crypto::seal`])
    pub ciphertext: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProofResponse {
    pub handle: Handle,
    pub input_proof: Bytes,
}

// ==================== User Decryption ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleContractPair {
    pub handle: Handle,
    pub contract_address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptRequest {
    pub handle_contract_pairs: Vec<HandleContractPair>,
    /// Ephemeral X25519 public key results are sealed to
    pub public_key: B256,
    pub signature: Bytes,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: u64,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedValue {
    pub handle: Handle,
    /// 8-byte little-endian plaintext sealed to the request's public key
    pub ciphertext: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptResponse {
    pub results: Vec<SealedValue>,
}

// ==================== Transactions ====================

/// Ledger entry points reachable through the transaction endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxMethod {
    RecordSalary,
    ClaimSalary,
}

impl TxMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxMethod::RecordSalary => "recordSalary",
            TxMethod::ClaimSalary => "claimSalary",
        }
    }
}

/// Unsigned transaction; signed as EIP-712 `PayrollTransaction`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub method: TxMethod,
    /// Encrypted input for `recordSalary`; zero for `claimSalary`
    #[serde(default)]
    pub handle: Handle,
    #[serde(default)]
    pub proof: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub transaction: TransactionPayload,
    pub signature: Bytes,
}

/// Event emitted by a contract during a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
    pub address: Address,
    pub name: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub tx_hash: B256,
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub method: TxMethod,
    pub events: Vec<EventLog>,
}

impl TransactionReceipt {
    pub fn event(&self, name: &str) -> Option<&EventLog> {
        self.events.iter().find(|e| e.name == name)
    }
}

// ==================== Reads ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub account: Address,
    pub nonce: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryResponse {
    pub account: Address,
    pub pending: Handle,
    pub total: Handle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account: Address,
    pub balance: Handle,
}
