//! # Confidential Payroll Contract
//!
//! A payroll ledger whose salary figures never appear in plaintext:
//! - Employees record encrypted salary amounts (ciphertext handle + input proof)
//! - Amounts accumulate homomorphically into `pending` and `total`
//! - Claiming zeroes `pending` and mints it as confidential cUSDT
//!
//! ## Architecture
//! - Ciphertexts live in the FHE backend; this contract only stores handles
//! - The backend is reached through [`FheExecutor`], injected per call
//! - The ledger is the sole minter of the [`ConfidentialToken`]
//!
//! ## Access Control
//! After every update the ledger grants itself and the employee access to
//! the new handles, so the employee can decrypt their own figures later.
//! On claim the token receives a transient grant on the claimed amount.

use std::collections::HashMap;

use confidential_token::{ConfidentialToken, TokenEvent};
use fhevm_host::{Address, CallContext, FheExecutor, Handle, HostError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Per-employee salary state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRecord {
    /// Recorded but not yet claimed
    pub pending: Handle,
    /// Everything ever recorded; claims do not reduce it
    pub total: Handle,
}

/// Events emitted by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum PayrollEvent {
    SalaryRecorded {
        account: Address,
        pending: Handle,
        total: Handle,
    },
    SalaryClaimed {
        account: Address,
        amount: Handle,
    },
}

impl PayrollEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PayrollEvent::SalaryRecorded { .. } => "SalaryRecorded",
            PayrollEvent::SalaryClaimed { .. } => "SalaryClaimed",
        }
    }
}

/// Result of a successful claim: the ledger event and the mint it triggered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub claimed: PayrollEvent,
    pub minted: TokenEvent,
}

#[derive(Debug, Clone)]
pub struct PayrollLedger {
    /// Address this ledger is deployed at
    address: Address,
    /// Confidential token this ledger mints into
    token: Address,
    salaries: HashMap<Address, SalaryRecord>,
}

impl PayrollLedger {
    pub fn new(address: Address, token: Address) -> Self {
        Self {
            address,
            token,
            salaries: HashMap::new(),
        }
    }

    // ==================== EMPLOYEE OPERATIONS ====================

    /// Add an encrypted amount to the caller's pending and total salary.
    ///
    /// `proof` must bind `encrypted_amount` to this ledger and the caller.
    pub fn record_salary<E: FheExecutor + ?Sized>(
        &mut self,
        ctx: &CallContext,
        fhe: &mut E,
        encrypted_amount: Handle,
        proof: &[u8],
    ) -> Result<PayrollEvent, HostError> {
        let account = ctx.sender;
        let amount = fhe.verify_input(encrypted_amount, proof, self.address, account)?;

        let record = self.salary_record(&account);
        let pending = fhe.add(self.address, record.pending, amount)?;
        let total = fhe.add(self.address, record.total, amount)?;

        for handle in [pending, total] {
            fhe.allow(self.address, handle, self.address)?;
            fhe.allow(self.address, handle, account)?;
        }

        self.salaries.insert(account, SalaryRecord { pending, total });

        info!(ledger = %self.address, %account, %pending, %total, "Salary recorded");

        Ok(PayrollEvent::SalaryRecorded {
            account,
            pending,
            total,
        })
    }

    /// Mint the caller's pending salary as cUSDT and reset pending to zero.
    ///
    /// A zero pending handle is a valid claim that mints an encryption of 0.
    /// If the mint fails nothing changes.
    pub fn claim_salary<E: FheExecutor + ?Sized>(
        &mut self,
        ctx: &CallContext,
        fhe: &mut E,
        token: &mut ConfidentialToken,
    ) -> Result<ClaimOutcome, HostError> {
        if token.address() != self.token {
            return Err(HostError::ContractMismatch {
                expected: self.token,
                actual: token.address(),
            });
        }

        let account = ctx.sender;
        let record = self.salary_record(&account);
        let amount = record.pending;

        if !amount.is_zero() {
            fhe.allow_transient(self.address, amount, self.token)?;
        }
        let minted = token.mint(&ctx.forwarded(self.address), fhe, account, amount)?;

        self.salaries.insert(
            account,
            SalaryRecord {
                pending: Handle::ZERO,
                total: record.total,
            },
        );

        info!(ledger = %self.address, %account, %amount, "Salary claimed");

        Ok(ClaimOutcome {
            claimed: PayrollEvent::SalaryClaimed { account, amount },
            minted,
        })
    }

    // ==================== VIEW METHODS ====================

    /// `(pending, total)` handles for `account`
    pub fn get_salary(&self, account: &Address) -> (Handle, Handle) {
        let record = self.salary_record(account);
        (record.pending, record.total)
    }

    pub fn salary_record(&self, account: &Address) -> SalaryRecord {
        self.salaries.get(account).copied().unwrap_or_default()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }
}
