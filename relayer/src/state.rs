//! Application State
//!
//! Shared state for the relayer, accessible from all route handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, B256};
use relayer_sdk::crypto::SealingKeypair;
use relayer_sdk::types::KeysResponse;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::error::RelayerError;
use crate::services::{DecryptionDomain, Devnet, InputVerifier};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    chain_id: u64,
    /// X25519 key clients seal inputs to
    network_key: SealingKeypair,
    /// Ed25519 signer for input proofs
    input_verifier: InputVerifier,
    decryption_verifier: Address,
    /// Contracts and coprocessor; every mutation happens under this lock
    devnet: Mutex<Devnet>,
    inputs_registered: AtomicU64,
    decryptions: AtomicU64,
    /// Server start time
    start_time: Instant,
}

impl AppState {
    pub fn new(
        chain_id: u64,
        network_key: SealingKeypair,
        input_verifier: InputVerifier,
        deployer: Address,
        decryption_verifier: Address,
    ) -> Result<Self, RelayerError> {
        let devnet = Devnet::deploy(chain_id, deployer, input_verifier.verifying_key(), unix_now())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                chain_id,
                network_key,
                input_verifier,
                decryption_verifier,
                devnet: Mutex::new(devnet),
                inputs_registered: AtomicU64::new(0),
                decryptions: AtomicU64::new(0),
                start_time: Instant::now(),
            }),
        })
    }

    /// Build from configuration, generating any missing development keys
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let network_key = SealingKeypair::from_secret_bytes(config.network_secret()?);
        let input_verifier = InputVerifier::from_hex(config.input_verifier_secret_key.as_deref())?;

        Ok(Self::new(
            config.chain_id,
            network_key,
            input_verifier,
            config.deployer_address()?,
            config.decryption_verifier_address()?,
        )?)
    }

    pub fn chain_id(&self) -> u64 {
        self.inner.chain_id
    }

    pub fn network_key(&self) -> &SealingKeypair {
        &self.inner.network_key
    }

    pub fn input_verifier(&self) -> &InputVerifier {
        &self.inner.input_verifier
    }

    pub fn decryption_domain(&self) -> DecryptionDomain {
        DecryptionDomain {
            chain_id: self.inner.chain_id,
            verifier: self.inner.decryption_verifier,
        }
    }

    pub fn keys(&self) -> KeysResponse {
        KeysResponse {
            chain_id: self.inner.chain_id,
            network_public_key: self.inner.network_key.public_key(),
            input_verifier_key: B256::from(self.inner.input_verifier.public_key()),
            decryption_verifier: self.inner.decryption_verifier,
        }
    }

    /// Exclusive access to the devnet; transactions are serialized here
    pub async fn devnet(&self) -> MutexGuard<'_, Devnet> {
        self.inner.devnet.lock().await
    }

    pub fn inputs_registered(&self) -> u64 {
        self.inner.inputs_registered.load(Ordering::Relaxed)
    }

    pub fn increment_inputs(&self) {
        self.inner.inputs_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decryptions(&self) -> u64 {
        self.inner.decryptions.load(Ordering::Relaxed)
    }

    pub fn increment_decryptions(&self) {
        self.inner.decryptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}

/// Current block time in seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
