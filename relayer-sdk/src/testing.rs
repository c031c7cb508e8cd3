//! In-memory [`RelayerTransport`] for unit tests.
//!
//! Registers inputs and answers user-decrypt requests from a plain map. It
//! checks the decrypt signature but keeps no ACL beyond "was registered".
//! Transactions are only nonce-checked; reads always return zero handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use fhevm_host::{FheType, Handle};

use crate::crypto::{self, SealingKeypair};
use crate::eip712;
use crate::error::SdkError;
use crate::transport::RelayerTransport;
use crate::types::{
    BalanceResponse, ContractsResponse, InputProofRequest, InputProofResponse, KeysResponse,
    SalaryResponse, SealedValue, SignedTransaction, TransactionReceipt, UserDecryptRequest,
    UserDecryptResponse,
};

const STUB_CHAIN_ID: u64 = 31337;

pub(crate) struct StubTransport {
    network: SealingKeypair,
    values: Mutex<HashMap<Handle, u64>>,
    counter: AtomicU64,
    decrypt_calls: AtomicUsize,
    key_calls: AtomicUsize,
    /// Number of upcoming `keys()` calls that fail as unreachable
    key_failures: AtomicUsize,
    nonces: Mutex<HashMap<Address, u64>>,
}

impl Default for StubTransport {
    fn default() -> Self {
        Self {
            network: SealingKeypair::generate(),
            values: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
            decrypt_calls: AtomicUsize::new(0),
            key_calls: AtomicUsize::new(0),
            key_failures: AtomicUsize::new(0),
            nonces: Mutex::new(HashMap::new()),
        }
    }
}

impl StubTransport {
    pub(crate) fn keys_response(&self) -> KeysResponse {
        KeysResponse {
            chain_id: STUB_CHAIN_ID,
            network_public_key: self.network.public_key(),
            input_verifier_key: B256::ZERO,
            decryption_verifier: Address::repeat_byte(0xDE),
        }
    }

    pub(crate) fn register(&self, contract: Address, value: u64) -> Handle {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut digest = [0u8; 32];
        digest[..8].copy_from_slice(&n.to_be_bytes());
        digest[8..28].copy_from_slice(contract.as_slice());
        let handle = Handle::derive(&digest, 0, STUB_CHAIN_ID, FheType::Euint64);
        self.values.lock().unwrap().insert(handle, value);
        handle
    }

    pub(crate) fn registered_value(&self, handle: Handle) -> Option<u64> {
        self.values.lock().unwrap().get(&handle).copied()
    }

    pub(crate) fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::Relaxed)
    }

    /// Make the next `n` key fetches fail
    pub(crate) fn fail_key_fetches(&self, n: usize) {
        self.key_failures.store(n, Ordering::Relaxed);
    }

    pub(crate) fn committed_nonce(&self, account: Address) -> u64 {
        self.nonces.lock().unwrap().get(&account).copied().unwrap_or_default()
    }

    fn unsupported<T>(what: &str) -> Result<T, SdkError> {
        Err(SdkError::Protocol(format!("stub does not support {what}")))
    }
}

#[async_trait]
impl RelayerTransport for StubTransport {
    async fn keys(&self) -> Result<KeysResponse, SdkError> {
        self.key_calls.fetch_add(1, Ordering::Relaxed);
        let failing = self
            .key_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SdkError::BackendUnreachable("connection refused".to_string()));
        }
        Ok(self.keys_response())
    }

    async fn contracts(&self) -> Result<ContractsResponse, SdkError> {
        Self::unsupported("contracts")
    }

    async fn input_proof(&self, request: &InputProofRequest) -> Result<InputProofResponse, SdkError> {
        let opened = self
            .network
            .open(
                &request.ciphertext,
                &crypto::input_aad(request.contract_address, request.user_address),
            )
            .map_err(|e| SdkError::ProofInvalid(e.to_string()))?;
        let value = crypto::decode_u64(&opened).map_err(|e| SdkError::InvalidPlaintext(e.to_string()))?;

        Ok(InputProofResponse {
            handle: self.register(request.contract_address, value),
            input_proof: Bytes::new(),
        })
    }

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<UserDecryptResponse, SdkError> {
        self.decrypt_calls.fetch_add(1, Ordering::Relaxed);

        let keys = self.keys_response();
        let hash = eip712::user_decrypt_hash(
            &eip712::decryption_domain(keys.chain_id, keys.decryption_verifier),
            request.public_key,
            &request.contract_addresses,
            request.start_timestamp,
            request.duration_seconds,
        );
        let signer = eip712::recover_signer(hash, &request.signature)
            .map_err(|e| SdkError::SignatureRejected(e.to_string()))?;
        if signer != request.user_address {
            return Err(SdkError::SignatureRejected(format!("recovered {signer}")));
        }

        let values = self.values.lock().unwrap();
        let mut results = Vec::with_capacity(request.handle_contract_pairs.len());
        for pair in &request.handle_contract_pairs {
            let value = values
                .get(&pair.handle)
                .copied()
                .ok_or(SdkError::GrantMissing { handle: pair.handle })?;
            let sealed = crypto::seal(
                request.public_key,
                &crypto::encode_u64(value),
                &crypto::result_aad(pair.handle),
            )
            .map_err(|e| SdkError::Protocol(e.to_string()))?;
            results.push(SealedValue {
                handle: pair.handle,
                ciphertext: sealed.into(),
            });
        }

        Ok(UserDecryptResponse { results })
    }

    async fn nonce(&self, account: Address) -> Result<u64, SdkError> {
        let nonce = self.committed_nonce(account);
        // Let concurrent callers read the same nonce
        tokio::task::yield_now().await;
        Ok(nonce)
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<TransactionReceipt, SdkError> {
        let tx = &tx.transaction;
        let mut nonces = self.nonces.lock().unwrap();
        let expected = nonces.get(&tx.from).copied().unwrap_or_default();
        if tx.nonce != expected {
            return Err(SdkError::TransactionReverted(format!(
                "Invalid nonce: expected {expected}, got {}",
                tx.nonce
            )));
        }
        nonces.insert(tx.from, expected + 1);

        Ok(TransactionReceipt {
            tx_hash: B256::with_last_byte(expected as u8),
            from: tx.from,
            to: tx.to,
            nonce: tx.nonce,
            method: tx.method,
            events: Vec::new(),
        })
    }

    async fn salary(&self, account: Address) -> Result<SalaryResponse, SdkError> {
        Ok(SalaryResponse {
            account,
            pending: Handle::ZERO,
            total: Handle::ZERO,
        })
    }

    async fn balance(&self, account: Address) -> Result<BalanceResponse, SdkError> {
        Ok(BalanceResponse {
            account,
            balance: Handle::ZERO,
        })
    }
}
