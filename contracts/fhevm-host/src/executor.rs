use alloy_primitives::Address;

use crate::{Handle, HostError};

/// Capability contracts use to operate on encrypted values.
///
/// Access control follows the fhEVM rules:
/// - a contract may compute on a non-zero handle only when it holds a
///   persistent or transient grant for it
/// - a computed handle is transiently granted to the contract that computed it
/// - a contract may only grant access to handles it is itself allowed on
///
/// The zero handle is never subject to access control; as an operand it
/// stands for an encryption of 0.
pub trait FheExecutor {
    /// Verify an input proof binding `input` to `(contract, user)`.
    ///
    /// On success `contract` receives a transient grant on the returned handle.
    fn verify_input(
        &mut self,
        input: Handle,
        proof: &[u8],
        contract: Address,
        user: Address,
    ) -> Result<Handle, HostError>;

    /// Homomorphic addition (wrapping, euint64 semantics)
    fn add(&mut self, caller: Address, lhs: Handle, rhs: Handle) -> Result<Handle, HostError>;

    /// Encrypt a public constant
    fn trivial_encrypt(&mut self, caller: Address, value: u64) -> Result<Handle, HostError>;

    /// Persistently grant `account` access to `handle`
    fn allow(&mut self, caller: Address, handle: Handle, account: Address) -> Result<(), HostError>;

    /// Grant `account` access to `handle` until the current transaction ends
    fn allow_transient(
        &mut self,
        caller: Address,
        handle: Handle,
        account: Address,
    ) -> Result<(), HostError>;

    fn is_allowed(&self, handle: Handle, account: Address) -> bool;
}
