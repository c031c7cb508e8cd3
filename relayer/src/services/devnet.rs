//! Devnet host
//!
//! Hosts one payroll ledger and its cUSDT token on top of the development
//! coprocessor and executes signed transactions against them.
//!
//! ## Execution model
//! - The caller serializes access (the relayer keeps the devnet behind a
//!   `tokio::sync::Mutex`), so transactions never interleave
//! - The contracts write their own storage only after every fallible step,
//!   and the coprocessor journals its writes for the duration of a
//!   transaction; a failed call is rolled back, so it changes nothing,
//!   including the sender's nonce
//! - Transient ACL grants are cleared when a transaction ends

use std::collections::HashMap;

use alloy_primitives::{Address, B256};
use confidential_payroll::PayrollLedger;
use confidential_token::ConfidentialToken;
use ed25519_dalek::VerifyingKey;
use fhevm_host::{CallContext, Handle};
use relayer_sdk::eip712;
use relayer_sdk::types::{
    ContractsResponse, EventLog, SignedTransaction, TransactionReceipt, TxMethod,
};
use serde::Serialize;
use tracing::{error, info};

use super::coprocessor::Coprocessor;
use crate::error::RelayerError;

#[derive(Debug)]
pub struct DevnetState {
    pub coprocessor: Coprocessor,
    pub token: ConfidentialToken,
    pub ledger: PayrollLedger,
    nonces: HashMap<Address, u64>,
}

pub struct Devnet {
    chain_id: u64,
    deployer: Address,
    state: DevnetState,
    transactions: u64,
}

impl Devnet {
    /// Deploy the token at `deployer`'s nonce 0 and the ledger at nonce 1,
    /// then make the ledger the token's minter
    pub fn deploy(
        chain_id: u64,
        deployer: Address,
        input_verifier: VerifyingKey,
        now: u64,
    ) -> Result<Self, RelayerError> {
        let token_address = deployer.create(0);
        let ledger_address = deployer.create(1);

        let mut token = ConfidentialToken::new(token_address, deployer);
        token.set_minter(&CallContext::new(deployer, now), ledger_address)?;
        let ledger = PayrollLedger::new(ledger_address, token_address);

        info!(
            chain_id,
            %deployer,
            token = %token_address,
            payroll = %ledger_address,
            "Devnet contracts deployed"
        );

        Ok(Self {
            chain_id,
            deployer,
            state: DevnetState {
                coprocessor: Coprocessor::new(chain_id, input_verifier),
                token,
                ledger,
                nonces: HashMap::new(),
            },
            transactions: 0,
        })
    }

    // ==================== Transactions ====================

    /// Verify and execute a signed transaction, all or nothing
    pub fn transact(
        &mut self,
        signed: &SignedTransaction,
        now: u64,
    ) -> Result<TransactionReceipt, RelayerError> {
        let tx = &signed.transaction;
        if tx.to != self.state.ledger.address() {
            return Err(RelayerError::NotFound(format!("no contract at {}", tx.to)));
        }

        let tx_hash = eip712::transaction_hash(&eip712::transaction_domain(self.chain_id), tx);
        let signer = eip712::recover_signer(tx_hash, &signed.signature)
            .map_err(|e| RelayerError::SignatureRejected(e.to_string()))?;
        if signer != tx.from {
            return Err(RelayerError::SignatureRejected(format!(
                "signed by {signer}, not {}",
                tx.from
            )));
        }

        let expected = self.nonce(&tx.from);
        if tx.nonce != expected {
            return Err(RelayerError::InvalidNonce {
                expected,
                got: tx.nonce,
            });
        }

        let ctx = CallContext::new(tx.from, now);
        self.state.coprocessor.begin_transaction();
        let events = match execute(&mut self.state, tx.method, tx.handle, &tx.proof, &ctx) {
            Ok(events) => events,
            Err(e) => {
                self.state.coprocessor.rollback_transaction();
                return Err(e);
            }
        };

        self.state.coprocessor.end_transaction();
        self.state.nonces.insert(tx.from, expected + 1);
        self.transactions += 1;

        info!(
            tx_hash = %tx_hash,
            from = %tx.from,
            method = tx.method.as_str(),
            nonce = tx.nonce,
            "Transaction committed"
        );

        Ok(TransactionReceipt {
            tx_hash,
            from: tx.from,
            to: tx.to,
            nonce: tx.nonce,
            method: tx.method,
            events,
        })
    }

    // ==================== Inputs ====================

    pub fn register_input(
        &mut self,
        ciphertext: &[u8],
        contract: Address,
        user: Address,
        value: u64,
    ) -> Handle {
        self.state
            .coprocessor
            .register_input(ciphertext, contract, user, value)
    }

    // ==================== Reads ====================

    pub fn contracts(&self) -> ContractsResponse {
        ContractsResponse {
            payroll: self.state.ledger.address(),
            token: self.state.token.address(),
            deployer: self.deployer,
        }
    }

    pub fn nonce(&self, account: &Address) -> u64 {
        self.state.nonces.get(account).copied().unwrap_or_default()
    }

    pub fn salary(&self, account: &Address) -> (Handle, Handle) {
        self.state.ledger.get_salary(account)
    }

    pub fn balance(&self, account: &Address) -> Handle {
        self.state.token.confidential_balance_of(account)
    }

    pub fn coprocessor(&self) -> &Coprocessor {
        &self.state.coprocessor
    }

    pub fn state(&self) -> &DevnetState {
        &self.state
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn transaction_count(&self) -> u64 {
        self.transactions
    }
}

/// Run one contract call; on error the caller rolls the coprocessor back
fn execute(
    state: &mut DevnetState,
    method: TxMethod,
    handle: Handle,
    proof: &[u8],
    ctx: &CallContext,
) -> Result<Vec<EventLog>, RelayerError> {
    let ledger_address = state.ledger.address();
    let token_address = state.token.address();

    let events = match method {
        TxMethod::RecordSalary => {
            let event = state
                .ledger
                .record_salary(ctx, &mut state.coprocessor, handle, proof)?;
            vec![event_log(ledger_address, event.name(), &event)]
        }
        TxMethod::ClaimSalary => {
            let outcome = state
                .ledger
                .claim_salary(ctx, &mut state.coprocessor, &mut state.token)?;
            vec![
                event_log(token_address, outcome.minted.name(), &outcome.minted),
                event_log(ledger_address, outcome.claimed.name(), &outcome.claimed),
            ]
        }
    };
    Ok(events)
}

fn event_log<T: Serialize>(address: Address, name: &str, event: &T) -> EventLog {
    let data = serde_json::to_value(event).unwrap_or_else(|e| {
        error!(event = name, error = %e, "Event not serializable");
        serde_json::Value::Null
    });
    EventLog {
        address,
        name: name.to_string(),
        data,
    }
}

/// Deterministic deployer used when none is configured
pub fn default_deployer() -> Address {
    Address::from_word(B256::left_padding_from(&[0xde, 0x91, 0x0e]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::input_verifier::InputVerifier;
    use alloy_primitives::Bytes;
    use alloy_signer_local::PrivateKeySigner;
    use fhevm_host::FheExecutor;
    use relayer_sdk::types::TransactionPayload;

    const CHAIN_ID: u64 = 31337;
    const NOW: u64 = 1_700_000_000;

    fn setup() -> (InputVerifier, Devnet) {
        let verifier = InputVerifier::new(&[8u8; 32]);
        let devnet = Devnet::deploy(CHAIN_ID, default_deployer(), verifier.verifying_key(), NOW).unwrap();
        (verifier, devnet)
    }

    fn sign(signer: &PrivateKeySigner, tx: TransactionPayload) -> SignedTransaction {
        let hash = eip712::transaction_hash(&eip712::transaction_domain(CHAIN_ID), &tx);
        SignedTransaction {
            transaction: tx,
            signature: eip712::sign_hash(signer, hash).unwrap(),
        }
    }

    fn record_tx(
        verifier: &InputVerifier,
        devnet: &mut Devnet,
        signer: &PrivateKeySigner,
        value: u64,
    ) -> SignedTransaction {
        let payroll = devnet.contracts().payroll;
        let account = signer.address();
        let handle = devnet.register_input(&value.to_le_bytes(), payroll, account, value);
        let proof = verifier.sign_input(handle, payroll, account, CHAIN_ID);
        sign(
            signer,
            TransactionPayload {
                from: account,
                to: payroll,
                nonce: devnet.nonce(&account),
                method: TxMethod::RecordSalary,
                handle,
                proof: Bytes::copy_from_slice(&proof),
            },
        )
    }

    fn claim_tx(devnet: &Devnet, signer: &PrivateKeySigner) -> SignedTransaction {
        let account = signer.address();
        sign(
            signer,
            TransactionPayload {
                from: account,
                to: devnet.contracts().payroll,
                nonce: devnet.nonce(&account),
                method: TxMethod::ClaimSalary,
                handle: Handle::ZERO,
                proof: Bytes::new(),
            },
        )
    }

    #[test]
    fn test_deploy_addresses_and_minter() {
        let (_, devnet) = setup();
        let contracts = devnet.contracts();

        assert_eq!(contracts.token, default_deployer().create(0));
        assert_eq!(contracts.payroll, default_deployer().create(1));
        assert_eq!(devnet.state().token.minter(), Some(contracts.payroll));
        assert_eq!(devnet.state().ledger.token(), contracts.token);
    }

    #[test]
    fn test_record_and_claim_flow() {
        let (verifier, mut devnet) = setup();
        let alice = PrivateKeySigner::random();

        let tx = record_tx(&verifier, &mut devnet, &alice, 500_000);
        devnet.transact(&tx, NOW).unwrap();
        let tx = record_tx(&verifier, &mut devnet, &alice, 250_000);
        let receipt = devnet.transact(&tx, NOW).unwrap();
        assert!(receipt.event("SalaryRecorded").is_some());

        let (pending, total) = devnet.salary(&alice.address());
        assert_eq!(devnet.coprocessor().plaintext(pending), Some(750_000));
        assert_eq!(devnet.coprocessor().plaintext(total), Some(750_000));

        let receipt = devnet.transact(&claim_tx(&devnet, &alice), NOW).unwrap();
        assert_eq!(receipt.events.len(), 2);
        assert!(receipt.event("ConfidentialMint").is_some());
        assert!(receipt.event("SalaryClaimed").is_some());

        let (pending, total) = devnet.salary(&alice.address());
        let balance = devnet.balance(&alice.address());
        assert!(pending.is_zero());
        assert_eq!(devnet.coprocessor().plaintext(total), Some(750_000));
        assert_eq!(devnet.coprocessor().plaintext(balance), Some(750_000));
        assert!(devnet.coprocessor().is_allowed(balance, alice.address()));
        assert_eq!(devnet.nonce(&alice.address()), 3);
        assert_eq!(devnet.transaction_count(), 3);
    }

    #[test]
    fn test_transient_grants_end_with_transaction() {
        let (verifier, mut devnet) = setup();
        let alice = PrivateKeySigner::random();
        let tx = record_tx(&verifier, &mut devnet, &alice, 10);
        let input = tx.transaction.handle;

        devnet.transact(&tx, NOW).unwrap();

        assert!(!devnet.coprocessor().is_allowed(input, devnet.contracts().payroll));
    }

    #[test]
    fn test_failed_transaction_changes_nothing() {
        let (verifier, mut devnet) = setup();
        let alice = PrivateKeySigner::random();
        let bob = PrivateKeySigner::random();

        // Alice's input replayed by Bob: proof is bound to Alice
        let alices = record_tx(&verifier, &mut devnet, &alice, 99);
        let mut stolen = alices.transaction.clone();
        stolen.from = bob.address();
        let stolen = sign(&bob, stolen);

        let err = devnet.transact(&stolen, NOW).unwrap_err();
        assert!(matches!(err, RelayerError::ProofInvalid(_)));
        assert_eq!(devnet.nonce(&bob.address()), 0);
        assert_eq!(devnet.salary(&bob.address()), (Handle::ZERO, Handle::ZERO));
        assert_eq!(devnet.transaction_count(), 0);
    }

    #[test]
    fn test_failed_transaction_leaves_no_handles_or_grants() {
        let (verifier, mut devnet) = setup();
        let alice = PrivateKeySigner::random();
        let tx = record_tx(&verifier, &mut devnet, &alice, 40);
        devnet.transact(&tx, NOW).unwrap();
        let handles = devnet.coprocessor().handle_count();

        // Same input with a corrupted proof
        let input = record_tx(&verifier, &mut devnet, &alice, 2);
        let handles_with_input = devnet.coprocessor().handle_count();
        assert_eq!(handles_with_input, handles + 1);
        let mut bad = input.transaction.clone();
        bad.proof = Bytes::from(vec![0u8; 64]);
        let bad = sign(&alice, bad);

        assert!(devnet.transact(&bad, NOW).is_err());
        assert_eq!(devnet.coprocessor().handle_count(), handles_with_input);
        assert!(!devnet
            .coprocessor()
            .is_allowed(input.transaction.handle, devnet.contracts().payroll));

        // The same input still records once the proof is right
        devnet.transact(&input, NOW).unwrap();
        let (pending, _) = devnet.salary(&alice.address());
        assert_eq!(devnet.coprocessor().plaintext(pending), Some(42));
    }

    #[test]
    fn test_rejects_forged_signature_and_stale_nonce() {
        let (verifier, mut devnet) = setup();
        let alice = PrivateKeySigner::random();
        let mallory = PrivateKeySigner::random();

        let mut forged = claim_tx(&devnet, &alice);
        forged.signature = claim_tx(&devnet, &mallory).signature;
        assert!(matches!(
            devnet.transact(&forged, NOW),
            Err(RelayerError::SignatureRejected(_))
        ));

        let tx = record_tx(&verifier, &mut devnet, &alice, 1);
        devnet.transact(&tx, NOW).unwrap();
        assert!(matches!(
            devnet.transact(&tx, NOW),
            Err(RelayerError::InvalidNonce { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_double_claim_mints_zero() {
        let (verifier, mut devnet) = setup();
        let alice = PrivateKeySigner::random();
        let tx = record_tx(&verifier, &mut devnet, &alice, 5);
        devnet.transact(&tx, NOW).unwrap();
        devnet.transact(&claim_tx(&devnet, &alice), NOW).unwrap();

        let receipt = devnet.transact(&claim_tx(&devnet, &alice), NOW).unwrap();

        let amount: Handle = serde_json::from_value(
            receipt.event("SalaryClaimed").unwrap().data["amount"].clone(),
        )
        .unwrap();
        assert!(amount.is_zero());
        assert_eq!(
            devnet.coprocessor().plaintext(devnet.balance(&alice.address())),
            Some(5)
        );
    }
}
