//! User decryption
//!
//! Obtains plaintexts for handles the account is entitled to, without the
//! relayer ever returning them in the clear:
//!
//! 1. Zero handles resolve to 0 locally (no signature, no request)
//! 2. A fresh viewer keypair is generated for the request
//! 3. The account signs `UserDecryptRequestVerification` over the viewer key,
//!    the contract set and a validity window
//! 4. The relayer checks signature, contract set, ACL and window, then seals
//!    each plaintext to the viewer key
//! 5. Results are opened locally and the viewer keypair is dropped

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use fhevm_host::Handle;
use tracing::{debug, info};

use crate::crypto::{self, SealingKeypair};
use crate::eip712;
use crate::error::SdkError;
use crate::transport::RelayerTransport;
use crate::types::{HandleContractPair, KeysResponse, UserDecryptRequest};

/// Validity window of a decryption authorization (10 days)
pub const DECRYPT_DURATION_SECS: u64 = 10 * 24 * 60 * 60;

/// Handles to decrypt, each paired with the contract that holds it
#[derive(Debug, Clone, Default)]
pub struct DecryptionRequest {
    pairs: Vec<HandleContractPair>,
}

impl DecryptionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handle: Handle, contract: Address) -> Self {
        self.pairs.push(HandleContractPair {
            handle,
            contract_address: contract,
        });
        self
    }

    pub fn pairs(&self) -> &[HandleContractPair] {
        &self.pairs
    }

    /// Non-zero pairs; zero handles never need the relayer
    fn pending_pairs(&self) -> Vec<HandleContractPair> {
        let mut pairs: Vec<HandleContractPair> = Vec::new();
        for pair in self.pairs.iter().filter(|p| !p.handle.is_zero()) {
            if !pairs.contains(pair) {
                pairs.push(*pair);
            }
        }
        pairs
    }

    /// Contracts named by the request, in first-seen order
    fn contract_addresses(pairs: &[HandleContractPair]) -> Vec<Address> {
        let mut contracts: Vec<Address> = Vec::new();
        for pair in pairs {
            if !contracts.contains(&pair.contract_address) {
                contracts.push(pair.contract_address);
            }
        }
        contracts
    }
}

pub struct UserDecryptor {
    transport: Arc<dyn RelayerTransport>,
}

impl UserDecryptor {
    pub fn new(transport: Arc<dyn RelayerTransport>) -> Self {
        Self { transport }
    }

    /// Decrypt every handle in `request`, authorizing from now for 10 days.
    ///
    /// All-or-nothing: one handle the account may not read fails the batch.
    pub async fn decrypt(
        &self,
        keys: &KeysResponse,
        signer: Option<&PrivateKeySigner>,
        request: &DecryptionRequest,
    ) -> Result<HashMap<Handle, u64>, SdkError> {
        let pairs = request.pending_pairs();
        let contracts = DecryptionRequest::contract_addresses(&pairs);
        let start = chrono::Utc::now().timestamp().max(0) as u64;
        self.decrypt_with(keys, signer, request, &contracts, start, DECRYPT_DURATION_SECS)
            .await
    }

    /// Decrypt under an explicit contract set and validity window
    pub async fn decrypt_with(
        &self,
        keys: &KeysResponse,
        signer: Option<&PrivateKeySigner>,
        request: &DecryptionRequest,
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_seconds: u64,
    ) -> Result<HashMap<Handle, u64>, SdkError> {
        let mut values: HashMap<Handle, u64> = request
            .pairs()
            .iter()
            .filter(|p| p.handle.is_zero())
            .map(|p| (p.handle, 0))
            .collect();

        let pairs = request.pending_pairs();
        if pairs.is_empty() {
            debug!("Only zero handles requested, skipping relayer");
            return Ok(values);
        }

        let signer = signer.ok_or(SdkError::SignerUnavailable)?;
        let account = signer.address();
        let viewer = SealingKeypair::generate();

        let domain = eip712::decryption_domain(keys.chain_id, keys.decryption_verifier);
        let hash = eip712::user_decrypt_hash(
            &domain,
            viewer.public_key(),
            contract_addresses,
            start_timestamp,
            duration_seconds,
        );
        let signature = eip712::sign_hash(signer, hash)?;

        let response = self
            .transport
            .user_decrypt(&UserDecryptRequest {
                handle_contract_pairs: pairs.clone(),
                public_key: viewer.public_key(),
                signature,
                contract_addresses: contract_addresses.to_vec(),
                user_address: account,
                start_timestamp,
                duration_seconds,
            })
            .await?;

        let mut sealed: HashMap<Handle, _> = response
            .results
            .into_iter()
            .map(|r| (r.handle, r.ciphertext))
            .collect();

        for pair in &pairs {
            let ciphertext = sealed.remove(&pair.handle).ok_or_else(|| {
                SdkError::Protocol(format!("relayer omitted handle {}", pair.handle))
            })?;
            let opened = viewer
                .open(&ciphertext, &crypto::result_aad(pair.handle))
                .map_err(|e| SdkError::Protocol(e.to_string()))?;
            let value = crypto::decode_u64(&opened).map_err(|e| SdkError::Protocol(e.to_string()))?;
            values.insert(pair.handle, value);
        }

        info!(%account, handles = pairs.len(), "User decryption completed");
        Ok(values)
    }
}
