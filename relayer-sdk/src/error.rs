//! Client error taxonomy
//!
//! Every failure the SDK can surface, split by what the caller should do
//! about it: retry, fix the input, or give up on the request.

use fhevm_host::Handle;
use thiserror::Error;

use crate::types::{ErrorCode, ErrorResponse};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("Encryption service is not ready")]
    EncryptionUnavailable,

    #[error("Input proof rejected: {0}")]
    ProofInvalid(String),

    #[error("Plaintext does not fit in 64 bits: {0}")]
    InvalidPlaintext(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("No signer available")]
    SignerUnavailable,

    #[error("Decryption not permitted for handle {handle}")]
    GrantMissing { handle: Handle },

    #[error("Decryption authorization expired or not yet valid")]
    AuthorizationExpired,

    #[error("Decryption signature rejected: {0}")]
    SignatureRejected(String),

    #[error("Relayer unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("{0} already in progress")]
    ActionInFlight(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed relayer response: {0}")]
    Protocol(String),
}

impl SdkError {
    /// Whether repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SdkError::EncryptionUnavailable
                | SdkError::BackendUnreachable(_)
                | SdkError::ActionInFlight(_)
        )
    }

    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            SdkError::EncryptionUnavailable => {
                "Encryption is still initializing, please try again shortly".to_string()
            }
            SdkError::ProofInvalid(_) => "The encrypted amount could not be verified".to_string(),
            SdkError::InvalidPlaintext(_) | SdkError::InvalidAmount(_) => {
                "Please enter a valid amount".to_string()
            }
            SdkError::Unauthorized(_) => "This account is not allowed to do that".to_string(),
            SdkError::SignerUnavailable => "Connect a wallet to continue".to_string(),
            SdkError::GrantMissing { .. } => {
                "This account is not allowed to decrypt that value".to_string()
            }
            SdkError::AuthorizationExpired => {
                "The decryption authorization expired, please sign again".to_string()
            }
            SdkError::SignatureRejected(_) => "The signature was not accepted".to_string(),
            SdkError::BackendUnreachable(_) => {
                "The relayer is unreachable, please try again".to_string()
            }
            SdkError::TransactionReverted(reason) => format!("Transaction failed: {reason}"),
            SdkError::ActionInFlight(action) => format!("{action} is already in progress"),
            SdkError::Config(_) | SdkError::Protocol(_) => "Unexpected client error".to_string(),
        }
    }
}

impl From<ErrorResponse> for SdkError {
    fn from(response: ErrorResponse) -> Self {
        let ErrorResponse { code, message, handle } = response;
        match code {
            ErrorCode::ProofInvalid => SdkError::ProofInvalid(message),
            ErrorCode::InvalidInput => SdkError::InvalidPlaintext(message),
            ErrorCode::Unauthorized => SdkError::Unauthorized(message),
            ErrorCode::GrantMissing => match handle {
                Some(handle) => SdkError::GrantMissing { handle },
                None => SdkError::Unauthorized(message),
            },
            ErrorCode::AuthorizationExpired => SdkError::AuthorizationExpired,
            ErrorCode::SignatureRejected => SdkError::SignatureRejected(message),
            ErrorCode::InvalidNonce | ErrorCode::TransactionReverted => {
                SdkError::TransactionReverted(message)
            }
            ErrorCode::NotFound | ErrorCode::InternalError => SdkError::Protocol(message),
        }
    }
}
