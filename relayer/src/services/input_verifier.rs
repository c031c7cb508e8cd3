//! Input Proof Signing Service
//!
//! Signs input proofs that bind a freshly registered handle to the contract
//! it may be consumed by and the account that submitted it. The coprocessor
//! checks the signature again when a contract calls `verify_input`, so a
//! proof issued for one contract cannot be replayed against another.

use alloy_primitives::Address;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use fhevm_host::Handle;
use sha2::{Digest, Sha256};
use thiserror::Error;

const INPUT_PROOF_DOMAIN: &[u8] = b"confidential-payroll:input-proof:v1";

pub const INPUT_PROOF_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum InputVerifierError {
    #[error("Invalid secret key: {0}")]
    InvalidKey(String),
}

/// Input verifier signer service
pub struct InputVerifier {
    /// Verifier signing key (Ed25519)
    signing_key: SigningKey,
}

impl InputVerifier {
    pub fn new(secret_key_bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret_key_bytes),
        }
    }

    /// Load from a hex secret, or generate a random one for development
    pub fn from_hex(secret_hex: Option<&str>) -> Result<Self, InputVerifierError> {
        let secret_hex = match secret_hex {
            Some(hex) => hex.trim_start_matches("0x").to_string(),
            None => {
                let key: [u8; 32] = rand::random();
                hex::encode(key)
            }
        };

        let secret_bytes: [u8; 32] = hex::decode(&secret_hex)
            .map_err(|e| InputVerifierError::InvalidKey(format!("Invalid secret key hex: {e}")))?
            .try_into()
            .map_err(|_| InputVerifierError::InvalidKey("Secret key must be 32 bytes".into()))?;

        Ok(Self::new(&secret_bytes))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign the binding of `handle` to `(contract, user)` on `chain_id`
    pub fn sign_input(
        &self,
        handle: Handle,
        contract: Address,
        user: Address,
        chain_id: u64,
    ) -> [u8; INPUT_PROOF_LEN] {
        let digest = input_digest(handle, contract, user, chain_id);
        self.signing_key.sign(&digest).to_bytes()
    }
}

/// Message signed by the input verifier
pub fn input_digest(handle: Handle, contract: Address, user: Address, chain_id: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(INPUT_PROOF_DOMAIN);

    hasher.update(handle.as_bytes());
    hasher.update(contract.as_slice());
    hasher.update(user.as_slice());
    hasher.update(chain_id.to_be_bytes());

    hasher.finalize().into()
}

/// Check an input proof against the verifier key
pub fn verify_input_proof(
    verifying_key: &VerifyingKey,
    proof: &[u8],
    handle: Handle,
    contract: Address,
    user: Address,
    chain_id: u64,
) -> bool {
    let Ok(bytes) = <[u8; INPUT_PROOF_LEN]>::try_from(proof) else {
        return false;
    };
    let signature = Signature::from_bytes(&bytes);
    verifying_key
        .verify(&input_digest(handle, contract, user, chain_id), &signature)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> Handle {
        Handle::new([7u8; 32])
    }

    #[test]
    fn test_sign_and_verify_input() {
        let verifier = InputVerifier::new(&[1u8; 32]);
        let contract = Address::repeat_byte(0x50);
        let user = Address::repeat_byte(0xA1);

        let proof = verifier.sign_input(handle(), contract, user, 31337);

        assert!(verify_input_proof(
            &verifier.verifying_key(),
            &proof,
            handle(),
            contract,
            user,
            31337
        ));
    }

    #[test]
    fn test_proof_is_bound_to_contract_user_and_chain() {
        let verifier = InputVerifier::new(&[1u8; 32]);
        let key = verifier.verifying_key();
        let contract = Address::repeat_byte(0x50);
        let user = Address::repeat_byte(0xA1);
        let proof = verifier.sign_input(handle(), contract, user, 31337);

        assert!(!verify_input_proof(&key, &proof, handle(), Address::repeat_byte(0x70), user, 31337));
        assert!(!verify_input_proof(&key, &proof, handle(), contract, Address::repeat_byte(0xB0), 31337));
        assert!(!verify_input_proof(&key, &proof, handle(), contract, user, 1));
        assert!(!verify_input_proof(&key, &proof[..63], handle(), contract, user, 31337));
    }

    #[test]
    fn test_from_hex() {
        let verifier = InputVerifier::from_hex(Some(&format!("0x{}", hex::encode([42u8; 32])))).unwrap();
        assert_eq!(verifier.public_key(), InputVerifier::new(&[42u8; 32]).public_key());

        assert!(InputVerifier::from_hex(Some("abcd")).is_err());
        assert!(InputVerifier::from_hex(None).is_ok());
    }
}
