//! In-memory [`FheExecutor`] for contract unit tests.
//!
//! Keeps the plaintext next to every handle so tests can check what a handle
//! decrypts to. Input proofs are plain SHA-256 bindings, not signatures.

use std::collections::{HashMap, HashSet};

use alloy_primitives::Address;
use sha2::{Digest, Sha256};

use crate::{FheExecutor, FheType, Handle, HostError};

const MOCK_CHAIN_ID: u64 = 31337;

#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    values: HashMap<Handle, u64>,
    persistent: HashSet<(Handle, Address)>,
    transient: HashSet<(Handle, Address)>,
    counter: u64,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt `value` for `user` to submit to `contract`
    pub fn encrypt_input(&mut self, contract: Address, user: Address, value: u64) -> (Handle, Vec<u8>) {
        let handle = self.fresh_handle(b"input", 0);
        self.values.insert(handle, value);
        self.persistent.insert((handle, user));
        (handle, Self::binding(handle, contract, user).to_vec())
    }

    /// Plaintext behind `handle`; the zero handle is 0
    pub fn decrypt(&self, handle: Handle) -> Option<u64> {
        if handle.is_zero() {
            return Some(0);
        }
        self.values.get(&handle).copied()
    }

    /// Drop transient grants, as the host does when a transaction ends
    pub fn end_transaction(&mut self) {
        self.transient.clear();
    }

    fn binding(handle: Handle, contract: Address, user: Address) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"mock-input-proof");
        hasher.update(handle.as_bytes());
        hasher.update(contract.as_slice());
        hasher.update(user.as_slice());
        hasher.finalize().into()
    }

    fn fresh_handle(&mut self, tag: &[u8], index: u8) -> Handle {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(self.counter.to_be_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        Handle::derive(&digest, index, MOCK_CHAIN_ID, FheType::Euint64)
    }

    fn operand(&self, caller: Address, handle: Handle) -> Result<u64, HostError> {
        if handle.is_zero() {
            return Ok(0);
        }
        if !self.is_allowed(handle, caller) {
            return Err(HostError::AccessDenied {
                handle,
                account: caller,
            });
        }
        self.values
            .get(&handle)
            .copied()
            .ok_or(HostError::UnknownHandle(handle))
    }

    fn store_result(&mut self, caller: Address, value: u64) -> Handle {
        let handle = self.fresh_handle(b"computed", 0xff);
        self.values.insert(handle, value);
        self.transient.insert((handle, caller));
        handle
    }
}

impl FheExecutor for MockExecutor {
    fn verify_input(
        &mut self,
        input: Handle,
        proof: &[u8],
        contract: Address,
        user: Address,
    ) -> Result<Handle, HostError> {
        let expected = Self::binding(input, contract, user);
        if input.is_zero() || proof != expected.as_slice() || !self.values.contains_key(&input) {
            return Err(HostError::ProofInvalid { handle: input });
        }
        self.transient.insert((input, contract));
        Ok(input)
    }

    fn add(&mut self, caller: Address, lhs: Handle, rhs: Handle) -> Result<Handle, HostError> {
        let sum = self
            .operand(caller, lhs)?
            .wrapping_add(self.operand(caller, rhs)?);
        Ok(self.store_result(caller, sum))
    }

    fn trivial_encrypt(&mut self, caller: Address, value: u64) -> Result<Handle, HostError> {
        Ok(self.store_result(caller, value))
    }

    fn allow(&mut self, caller: Address, handle: Handle, account: Address) -> Result<(), HostError> {
        if !self.is_allowed(handle, caller) {
            return Err(HostError::AccessDenied {
                handle,
                account: caller,
            });
        }
        self.persistent.insert((handle, account));
        Ok(())
    }

    fn allow_transient(
        &mut self,
        caller: Address,
        handle: Handle,
        account: Address,
    ) -> Result<(), HostError> {
        if !self.is_allowed(handle, caller) {
            return Err(HostError::AccessDenied {
                handle,
                account: caller,
            });
        }
        self.transient.insert((handle, account));
        Ok(())
    }

    fn is_allowed(&self, handle: Handle, account: Address) -> bool {
        self.persistent.contains(&(handle, account)) || self.transient.contains(&(handle, account))
    }
}
