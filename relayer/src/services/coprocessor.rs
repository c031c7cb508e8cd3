//! Development coprocessor
//!
//! Stands in for the FHE coprocessor: every handle maps to the plaintext it
//! encrypts, and an ACL registry records which accounts may use which handle.
//! Contracts reach it only through [`FheExecutor`]; the KMS reads plaintexts
//! directly after its own authorization checks.
//!
//! ## ACL rules
//! - A caller needs a grant on every non-zero operand
//! - Results of `add`/`trivial_encrypt` are transiently granted to the caller
//! - `allow`/`allow_transient` require the caller itself to hold a grant
//! - Persistent grants are never revoked; transient ones end with the transaction
//!
//! Between [`Coprocessor::begin_transaction`] and the matching commit or
//! rollback, every new handle and persistent grant is journaled so a failed
//! transaction can be undone without copying the store.

use std::collections::{HashMap, HashSet};

use alloy_primitives::Address;
use ed25519_dalek::VerifyingKey;
use fhevm_host::{FheExecutor, FheType, Handle, HostError};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::input_verifier::verify_input_proof;

const INPUT_HANDLE_DOMAIN: &[u8] = b"confidential-payroll:input-handle:v1";
const COMPUTED_HANDLE_DOMAIN: &[u8] = b"confidential-payroll:computed-handle:v1";

/// Index byte of handles produced by computation rather than input
const COMPUTED_INDEX: u8 = 0xff;

/// Write made inside an open transaction
#[derive(Debug, Clone, Copy)]
enum JournalEntry {
    Value(Handle),
    Grant(Handle, Address),
}

/// Undo log of the open transaction
#[derive(Debug, Clone)]
struct Journal {
    ops: u64,
    entries: Vec<JournalEntry>,
}

#[derive(Debug, Clone)]
pub struct Coprocessor {
    chain_id: u64,
    input_verifier: VerifyingKey,
    values: HashMap<Handle, u64>,
    persistent: HashSet<(Handle, Address)>,
    transient: HashSet<(Handle, Address)>,
    /// Computation counter, keeps computed handles unique
    ops: u64,
    journal: Option<Journal>,
}

impl Coprocessor {
    pub fn new(chain_id: u64, input_verifier: VerifyingKey) -> Self {
        Self {
            chain_id,
            input_verifier,
            values: HashMap::new(),
            persistent: HashSet::new(),
            transient: HashSet::new(),
            ops: 0,
            journal: None,
        }
    }

    /// Store a client-submitted plaintext under a fresh input handle and
    /// grant the submitting account access to it
    pub fn register_input(
        &mut self,
        ciphertext: &[u8],
        contract: Address,
        user: Address,
        value: u64,
    ) -> Handle {
        let mut hasher = Sha256::new();
        hasher.update(INPUT_HANDLE_DOMAIN);
        hasher.update(ciphertext);
        hasher.update(contract.as_slice());
        hasher.update(user.as_slice());
        hasher.update(self.chain_id.to_be_bytes());
        let digest: [u8; 32] = hasher.finalize().into();

        let handle = Handle::derive(&digest, 0, self.chain_id, FheType::Euint64);
        self.insert_value(handle, value);
        self.insert_grant(handle, user);

        debug!(%handle, %contract, %user, "Input registered");
        handle
    }

    /// Plaintext behind `handle`; the zero handle is 0
    pub fn plaintext(&self, handle: Handle) -> Option<u64> {
        if handle.is_zero() {
            return Some(0);
        }
        self.values.get(&handle).copied()
    }

    /// Start journaling writes for a transaction
    pub fn begin_transaction(&mut self) {
        self.transient.clear();
        self.journal = Some(Journal {
            ops: self.ops,
            entries: Vec::new(),
        });
    }

    /// Keep the transaction's writes and drop its transient grants
    pub fn end_transaction(&mut self) {
        self.journal = None;
        self.transient.clear();
    }

    /// Undo every write since `begin_transaction`
    pub fn rollback_transaction(&mut self) {
        if let Some(journal) = self.journal.take() {
            for entry in journal.entries.into_iter().rev() {
                match entry {
                    JournalEntry::Value(handle) => {
                        self.values.remove(&handle);
                    }
                    JournalEntry::Grant(handle, account) => {
                        self.persistent.remove(&(handle, account));
                    }
                }
            }
            self.ops = journal.ops;
        }
        self.transient.clear();
    }

    pub fn handle_count(&self) -> usize {
        self.values.len()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn insert_value(&mut self, handle: Handle, value: u64) {
        if self.values.insert(handle, value).is_none() {
            if let Some(journal) = self.journal.as_mut() {
                journal.entries.push(JournalEntry::Value(handle));
            }
        }
    }

    fn insert_grant(&mut self, handle: Handle, account: Address) {
        if self.persistent.insert((handle, account)) {
            if let Some(journal) = self.journal.as_mut() {
                journal.entries.push(JournalEntry::Grant(handle, account));
            }
        }
    }

    fn computed_handle(&mut self, op: &[u8], operands: &[&[u8]]) -> Handle {
        self.ops += 1;
        let mut hasher = Sha256::new();
        hasher.update(COMPUTED_HANDLE_DOMAIN);
        hasher.update(op);
        for operand in operands {
            hasher.update(operand);
        }
        hasher.update(self.ops.to_be_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        Handle::derive(&digest, COMPUTED_INDEX, self.chain_id, FheType::Euint64)
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

    fn assert_allowed(&self, caller: Address, handle: Handle) -> Result<(), HostError> {
        if self.is_allowed(handle, caller) {
            Ok(())
        } else {
            Err(HostError::AccessDenied {
                handle,
                account: caller,
            })
        }
    }
}

impl FheExecutor for Coprocessor {
    fn verify_input(
        &mut self,
        input: Handle,
        proof: &[u8],
        contract: Address,
        user: Address,
    ) -> Result<Handle, HostError> {
        let valid = !input.is_zero()
            && input.chain_id() == self.chain_id
            && self.values.contains_key(&input)
            && verify_input_proof(&self.input_verifier, proof, input, contract, user, self.chain_id);
        if !valid {
            return Err(HostError::ProofInvalid { handle: input });
        }

        self.transient.insert((input, contract));
        Ok(input)
    }

    fn add(&mut self, caller: Address, lhs: Handle, rhs: Handle) -> Result<Handle, HostError> {
        let sum = self
            .operand(caller, lhs)?
            .wrapping_add(self.operand(caller, rhs)?);

        let result = self.computed_handle(b"add", &[&lhs.as_bytes()[..], &rhs.as_bytes()[..]]);
        self.insert_value(result, sum);
        self.transient.insert((result, caller));
        Ok(result)
    }

    fn trivial_encrypt(&mut self, caller: Address, value: u64) -> Result<Handle, HostError> {
        let result = self.computed_handle(b"trivial", &[&value.to_be_bytes()[..]]);
        self.insert_value(result, value);
        self.transient.insert((result, caller));
        Ok(result)
    }

    fn allow(&mut self, caller: Address, handle: Handle, account: Address) -> Result<(), HostError> {
        self.assert_allowed(caller, handle)?;
        self.insert_grant(handle, account);
        Ok(())
    }

    fn allow_transient(
        &mut self,
        caller: Address,
        handle: Handle,
        account: Address,
    ) -> Result<(), HostError> {
        self.assert_allowed(caller, handle)?;
        self.transient.insert((handle, account));
        Ok(())
    }

    fn is_allowed(&self, handle: Handle, account: Address) -> bool {
        self.persistent.contains(&(handle, account)) || self.transient.contains(&(handle, account))
    }
}
