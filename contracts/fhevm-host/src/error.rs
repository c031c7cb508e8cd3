use alloy_primitives::Address;
use thiserror::Error;

use crate::Handle;

/// Failures raised by contract calls. Any error reverts the whole call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Input proof rejected for handle {handle}")]
    ProofInvalid { handle: Handle },

    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("Minter already set to {0}")]
    MinterAlreadySet(Address),

    #[error("{account} is not allowed to use handle {handle}")]
    AccessDenied { handle: Handle, account: Address },

    #[error("Unknown handle {0}")]
    UnknownHandle(Handle),

    #[error("Expected contract {expected}, got {actual}")]
    ContractMismatch { expected: Address, actual: Address },
}
