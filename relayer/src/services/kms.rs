//! User decryption (development KMS)
//!
//! Re-encrypts handle plaintexts to a requester's ephemeral viewer key once
//! the request passes every check, in this order:
//!
//! 1. The EIP-712 signature recovers to `userAddress`
//! 2. Every pair's contract is inside the signed contract set
//! 3. The ACL grants both the user and the pair's contract each handle
//! 4. `now` lies inside `[startTimestamp, startTimestamp + durationSeconds]`
//!
//! Any failing handle fails the whole batch.

use alloy_primitives::Address;
use fhevm_host::FheExecutor;
use relayer_sdk::crypto;
use relayer_sdk::eip712;
use relayer_sdk::types::{SealedValue, UserDecryptRequest, UserDecryptResponse};
use tracing::info;

use super::coprocessor::Coprocessor;
use crate::error::RelayerError;

/// Authorization parameters fixed by the deployment
#[derive(Debug, Clone, Copy)]
pub struct DecryptionDomain {
    pub chain_id: u64,
    /// `verifyingContract` of the EIP-712 domain
    pub verifier: Address,
}

pub fn user_decrypt(
    domain: DecryptionDomain,
    coprocessor: &Coprocessor,
    request: &UserDecryptRequest,
    now: u64,
) -> Result<UserDecryptResponse, RelayerError> {
    if request.handle_contract_pairs.is_empty() {
        return Err(RelayerError::InvalidInput("no handles requested".into()));
    }
    if request.contract_addresses.is_empty() {
        return Err(RelayerError::InvalidInput("empty contract set".into()));
    }

    let hash = eip712::user_decrypt_hash(
        &eip712::decryption_domain(domain.chain_id, domain.verifier),
        request.public_key,
        &request.contract_addresses,
        request.start_timestamp,
        request.duration_seconds,
    );
    let signer = eip712::recover_signer(hash, &request.signature)
        .map_err(|e| RelayerError::SignatureRejected(e.to_string()))?;
    if signer != request.user_address {
        return Err(RelayerError::SignatureRejected(format!(
            "signed by {signer}, not {}",
            request.user_address
        )));
    }

    let user = request.user_address;
    for pair in &request.handle_contract_pairs {
        let contract = pair.contract_address;
        if !request.contract_addresses.contains(&contract) || contract == user {
            return Err(RelayerError::GrantMissing(pair.handle));
        }
        if pair.handle.is_zero() {
            continue;
        }
        if !coprocessor.is_allowed(pair.handle, user) || !coprocessor.is_allowed(pair.handle, contract) {
            return Err(RelayerError::GrantMissing(pair.handle));
        }
    }

    let window_end = request
        .start_timestamp
        .saturating_add(request.duration_seconds);
    if now < request.start_timestamp || now > window_end {
        return Err(RelayerError::AuthorizationExpired {
            start: request.start_timestamp,
            duration: request.duration_seconds,
            now,
        });
    }

    let mut results = Vec::with_capacity(request.handle_contract_pairs.len());
    for pair in &request.handle_contract_pairs {
        let value = coprocessor
            .plaintext(pair.handle)
            .ok_or(RelayerError::GrantMissing(pair.handle))?;
        let sealed = crypto::seal(
            request.public_key,
            &crypto::encode_u64(value),
            &crypto::result_aad(pair.handle),
        )
        .map_err(|e| RelayerError::Internal(e.to_string()))?;
        results.push(SealedValue {
            handle: pair.handle,
            ciphertext: sealed.into(),
        });
    }

    info!(%user, handles = results.len(), "User decryption authorized");
    Ok(UserDecryptResponse { results })
}
