//! Relayer errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fhevm_host::{Handle, HostError};
use relayer_sdk::types::{ErrorCode, ErrorResponse};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input proof rejected for handle {0}")]
    ProofInvalid(Handle),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User is not allowed to decrypt handle {0}")]
    GrantMissing(Handle),

    #[error("Decryption window [{start}, {start} + {duration}] does not contain {now}")]
    AuthorizationExpired { start: u64, duration: u64, now: u64 },

    #[error("Signature rejected: {0}")]
    SignatureRejected(String),

    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    #[error("Transaction reverted: {0}")]
    Reverted(HostError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RelayerError::InvalidInput(_) => ErrorCode::InvalidInput,
            RelayerError::ProofInvalid(_) => ErrorCode::ProofInvalid,
            RelayerError::Unauthorized(_) => ErrorCode::Unauthorized,
            RelayerError::GrantMissing(_) => ErrorCode::GrantMissing,
            RelayerError::AuthorizationExpired { .. } => ErrorCode::AuthorizationExpired,
            RelayerError::SignatureRejected(_) => ErrorCode::SignatureRejected,
            RelayerError::InvalidNonce { .. } => ErrorCode::InvalidNonce,
            RelayerError::Reverted(_) => ErrorCode::TransactionReverted,
            RelayerError::NotFound(_) => ErrorCode::NotFound,
            RelayerError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayerError::InvalidInput(_) | RelayerError::ProofInvalid(_) => StatusCode::BAD_REQUEST,
            RelayerError::SignatureRejected(_) => StatusCode::UNAUTHORIZED,
            RelayerError::Unauthorized(_)
            | RelayerError::GrantMissing(_)
            | RelayerError::AuthorizationExpired { .. } => StatusCode::FORBIDDEN,
            RelayerError::InvalidNonce { .. } => StatusCode::CONFLICT,
            RelayerError::Reverted(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayerError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn handle(&self) -> Option<Handle> {
        match self {
            RelayerError::ProofInvalid(handle) | RelayerError::GrantMissing(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl From<HostError> for RelayerError {
    fn from(error: HostError) -> Self {
        match error {
            HostError::ProofInvalid { handle } => RelayerError::ProofInvalid(handle),
            HostError::Unauthorized { .. } => RelayerError::Unauthorized(error.to_string()),
            other => RelayerError::Reverted(other),
        }
    }
}

impl IntoResponse for RelayerError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(code = ?self.code(), error = %self, "Request rejected");

        let mut body = ErrorResponse::new(self.code(), self.to_string());
        if let Some(handle) = self.handle() {
            body = body.with_handle(handle);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    #[test]
    fn test_host_error_mapping() {
        let handle = Handle::new([1u8; 32]);

        let err: RelayerError = HostError::ProofInvalid { handle }.into();
        assert_eq!(err.code(), ErrorCode::ProofInvalid);
        assert_eq!(err.handle(), Some(handle));

        let err: RelayerError = HostError::Unauthorized {
            caller: Address::ZERO,
            action: "mint",
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        let err: RelayerError = HostError::UnknownHandle(handle).into();
        assert_eq!(err.code(), ErrorCode::TransactionReverted);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_expired_and_missing_grant_are_distinct() {
        let expired = RelayerError::AuthorizationExpired {
            start: 0,
            duration: 1,
            now: 5,
        };
        let missing = RelayerError::GrantMissing(Handle::new([2u8; 32]));
        assert_ne!(expired.code(), missing.code());
        assert_eq!(expired.status(), missing.status());
    }
}
