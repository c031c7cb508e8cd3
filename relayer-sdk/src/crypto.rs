//! Sealed boxes over X25519 + XChaCha20-Poly1305
//!
//! Used in both directions between client and relayer:
//! - client seals input plaintexts to the network key
//! - relayer seals decrypted values to the requester's ephemeral viewer key
//!
//! Wire layout: `ephemeral_pk (32) || nonce (24) || ciphertext_with_tag`.
//! The symmetric key is `SHA-256(domain || shared_secret || ephemeral_pk || recipient_pk)`.

use alloy_primitives::{Address, B256};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use fhevm_host::Handle;

const SEAL_DOMAIN: &[u8] = b"confidential-payroll:seal:v1";

pub const PUBLIC_KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;
/// Smallest well-formed sealed box (empty plaintext)
pub const SEAL_OVERHEAD: usize = PUBLIC_KEY_LEN + NONCE_LEN + TAG_LEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Sealed box too short: {0} bytes")]
    Truncated(usize),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    #[error("Decryption failed: {0}")]
    Decryption(String),
    #[error("Expected an 8-byte value, got {0} bytes")]
    InvalidValueLength(usize),
}

/// X25519 keypair that can open sealed boxes addressed to it.
///
/// The relayer holds one long-lived instance as its network key; clients
/// generate a fresh one for every decryption request.
pub struct SealingKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl SealingKeypair {
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(StaticSecret::from(bytes))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> B256 {
        B256::from(self.public.to_bytes())
    }

    pub fn open(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < SEAL_OVERHEAD {
            return Err(CryptoError::Truncated(sealed.len()));
        }
        let (eph_bytes, rest) = sealed.split_at(PUBLIC_KEY_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let mut eph = [0u8; PUBLIC_KEY_LEN];
        eph.copy_from_slice(eph_bytes);
        let eph_public = PublicKey::from(eph);

        let shared = self.secret.diffie_hellman(&eph_public);
        let mut key = derive_key(shared.as_bytes(), &eph, self.public.as_bytes());

        let cipher = XChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| CryptoError::Decryption(e.to_string()));
        key.zeroize();

        cipher?
            .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

/// Seal `plaintext` to `recipient` under a fresh ephemeral key
pub fn seal(recipient: B256, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let eph_secret = StaticSecret::random_from_rng(OsRng);
    let eph_public = PublicKey::from(&eph_secret);
    let recipient_public = PublicKey::from(recipient.0);

    let shared = eph_secret.diffie_hellman(&recipient_public);
    let mut key = derive_key(shared.as_bytes(), eph_public.as_bytes(), recipient_public.as_bytes());

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = XChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| CryptoError::Encryption(e.to_string()));
    key.zeroize();

    let ciphertext = cipher?
        .encrypt(XNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(SEAL_OVERHEAD + plaintext.len());
    sealed.extend_from_slice(eph_public.as_bytes());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn derive_key(shared: &[u8; 32], eph_public: &[u8; 32], recipient_public: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SEAL_DOMAIN);
    hasher.update(shared);
    hasher.update(eph_public);
    hasher.update(recipient_public);
    hasher.finalize().into()
}

// ==================== Associated Data ====================

/// AAD for an input ciphertext: binds it to the contract and the submitting account
pub fn input_aad(contract: Address, user: Address) -> Vec<u8> {
    let mut aad = Vec::with_capacity(40);
    aad.extend_from_slice(contract.as_slice());
    aad.extend_from_slice(user.as_slice());
    aad
}

/// AAD for a re-encrypted value: binds it to the handle it decrypts
pub fn result_aad(handle: Handle) -> Vec<u8> {
    handle.as_bytes().to_vec()
}

// ==================== euint64 Encoding ====================

pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64, CryptoError> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidValueLength(bytes.len()))?;
    Ok(u64::from_le_bytes(array))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_open() {
        let recipient = SealingKeypair::generate();
        let aad = input_aad(Address::repeat_byte(0x50), Address::repeat_byte(0xA1));

        let sealed = seal(recipient.public_key(), &encode_u64(750_000), &aad).unwrap();
        assert_eq!(sealed.len(), SEAL_OVERHEAD + 8);

        let opened = recipient.open(&sealed, &aad).unwrap();
        assert_eq!(decode_u64(&opened).unwrap(), 750_000);
    }

    #[test]
    fn test_open_rejects_wrong_aad() {
        let recipient = SealingKeypair::generate();
        let sealed = seal(
            recipient.public_key(),
            &encode_u64(1),
            &input_aad(Address::repeat_byte(0x50), Address::repeat_byte(0xA1)),
        )
        .unwrap();

        let other = input_aad(Address::repeat_byte(0x70), Address::repeat_byte(0xA1));
        assert!(matches!(
            recipient.open(&sealed, &other),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_open_rejects_other_recipient() {
        let recipient = SealingKeypair::generate();
        let eavesdropper = SealingKeypair::generate();
        let sealed = seal(recipient.public_key(), b"secret", b"").unwrap();

        assert!(eavesdropper.open(&sealed, b"").is_err());
    }

    #[test]
    fn test_open_rejects_truncated() {
        let recipient = SealingKeypair::from_secret_bytes([9u8; 32]);
        assert_eq!(
            recipient.open(&[0u8; 10], b""),
            Err(CryptoError::Truncated(10))
        );
    }

    #[test]
    fn test_decode_u64_length() {
        assert_eq!(decode_u64(&[1, 0, 0, 0, 0, 0, 0, 0]), Ok(1));
        assert_eq!(decode_u64(&[1, 2, 3]), Err(CryptoError::InvalidValueLength(3)));
    }
}
