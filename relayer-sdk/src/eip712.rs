//! EIP-712 typed data
//!
//! Two message types are signed with the account's secp256k1 key:
//! - `UserDecryptRequestVerification` authorizes re-encryption of handles to
//!   an ephemeral public key for a bounded time window
//! - `PayrollTransaction` authorizes a ledger call on the devnet

use alloy_primitives::{Address, Bytes, Signature, SignatureError, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, Eip712Domain, SolStruct};

use crate::error::SdkError;
use crate::types::TransactionPayload;

pub const DECRYPTION_DOMAIN_NAME: &str = "Decryption";
pub const DECRYPTION_DOMAIN_VERSION: &str = "1";
pub const TRANSACTION_DOMAIN_NAME: &str = "ConfidentialPayrollDevnet";
pub const TRANSACTION_DOMAIN_VERSION: &str = "1";

sol! {
    #[derive(Debug)]
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationSeconds;
    }

    #[derive(Debug)]
    struct PayrollTransaction {
        address from;
        address to;
        uint256 nonce;
        string method;
        bytes32 handle;
        bytes proof;
    }
}

pub fn decryption_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(DECRYPTION_DOMAIN_NAME.into()),
        Some(DECRYPTION_DOMAIN_VERSION.into()),
        Some(U256::from(chain_id)),
        Some(verifying_contract),
        None,
    )
}

pub fn transaction_domain(chain_id: u64) -> Eip712Domain {
    Eip712Domain::new(
        Some(TRANSACTION_DOMAIN_NAME.into()),
        Some(TRANSACTION_DOMAIN_VERSION.into()),
        Some(U256::from(chain_id)),
        None,
        None,
    )
}

pub fn user_decrypt_message(
    public_key: B256,
    contract_addresses: &[Address],
    start_timestamp: u64,
    duration_seconds: u64,
) -> UserDecryptRequestVerification {
    UserDecryptRequestVerification {
        publicKey: Bytes::copy_from_slice(public_key.as_slice()),
        contractAddresses: contract_addresses.to_vec(),
        startTimestamp: U256::from(start_timestamp),
        durationSeconds: U256::from(duration_seconds),
    }
}

impl From<&TransactionPayload> for PayrollTransaction {
    fn from(tx: &TransactionPayload) -> Self {
        Self {
            from: tx.from,
            to: tx.to,
            nonce: U256::from(tx.nonce),
            method: tx.method.as_str().to_string(),
            handle: tx.handle.as_b256(),
            proof: tx.proof.clone(),
        }
    }
}

/// Typed-data hash of a decryption authorization
pub fn user_decrypt_hash(
    domain: &Eip712Domain,
    public_key: B256,
    contract_addresses: &[Address],
    start_timestamp: u64,
    duration_seconds: u64,
) -> B256 {
    user_decrypt_message(public_key, contract_addresses, start_timestamp, duration_seconds)
        .eip712_signing_hash(domain)
}

/// Typed-data hash of a devnet transaction
pub fn transaction_hash(domain: &Eip712Domain, tx: &TransactionPayload) -> B256 {
    PayrollTransaction::from(tx).eip712_signing_hash(domain)
}

/// Sign a prehashed typed-data digest, returning the 65-byte `r || s || v` form
pub fn sign_hash(signer: &PrivateKeySigner, hash: B256) -> Result<Bytes, SdkError> {
    let signature = signer
        .sign_hash_sync(&hash)
        .map_err(|e| SdkError::SignatureRejected(e.to_string()))?;
    Ok(Bytes::copy_from_slice(&signature.as_bytes()))
}

/// Recover the signer of `hash` from a 65-byte signature
pub fn recover_signer(hash: B256, signature: &[u8]) -> Result<Address, SignatureError> {
    Signature::from_raw(signature)?.recover_address_from_prehash(&hash)
}
