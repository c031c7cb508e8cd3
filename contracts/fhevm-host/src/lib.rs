//! # fhEVM Host Primitives
//!
//! Shared building blocks for the confidential payroll contracts:
//! - [`Handle`]: opaque 32-byte reference to a ciphertext held by the FHE backend
//! - [`FheExecutor`]: the capability contracts use to compute on ciphertexts
//! - [`CallContext`]: who is calling, and when
//!
//! ## Execution Model
//! Contracts in this workspace are plain state machines. They assume the
//! surrounding host runs each call to completion without interleaving and
//! discards every effect of a call that returns an error. The relayer devnet
//! provides exactly that guarantee.

pub mod context;
pub mod error;
pub mod executor;
pub mod handle;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use alloy_primitives::Address;
pub use context::CallContext;
pub use error::HostError;
pub use executor::FheExecutor;
pub use handle::{FheType, Handle, HandleParseError, HANDLE_VERSION};
