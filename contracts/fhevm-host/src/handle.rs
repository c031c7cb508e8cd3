//! Ciphertext handles
//!
//! A handle is a 32-byte identifier for a ciphertext stored by the FHE
//! backend. Contracts only ever see handles, never values. Every homomorphic
//! operation yields a new handle; existing handles are never mutated.
//!
//! Byte layout of backend-issued handles:
//!
//! ```text
//! [0..21)   digest prefix
//! [21]      input index (0xff for computed handles)
//! [22..30)  chain id, big-endian
//! [30]      FHE type
//! [31]      handle version
//! ```
//!
//! The all-zero handle is the "never written" sentinel and decrypts to 0.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version byte stamped into every issued handle
pub const HANDLE_VERSION: u8 = 0;

/// Encrypted types supported by the payroll contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FheType {
    Euint64 = 5,
}

impl FheType {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn bit_width(self) -> u32 {
        match self {
            FheType::Euint64 => 64,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            5 => Some(FheType::Euint64),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleParseError {
    #[error("Invalid handle hex: {0}")]
    InvalidHex(String),
    #[error("Handle must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Opaque reference to an encrypted value
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(B256);

impl Handle {
    /// Sentinel for "no encrypted value has ever been written here"
    pub const ZERO: Handle = Handle(B256::ZERO);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Build a handle from a backend digest using the layout described above
    pub fn derive(digest: &[u8; 32], index: u8, chain_id: u64, fhe_type: FheType) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..21].copy_from_slice(&digest[..21]);
        bytes[21] = index;
        bytes[22..30].copy_from_slice(&chain_id.to_be_bytes());
        bytes[30] = fhe_type.as_byte();
        bytes[31] = HANDLE_VERSION;
        Self::new(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    pub fn as_b256(&self) -> B256 {
        self.0
    }

    pub fn fhe_type(&self) -> Option<FheType> {
        FheType::from_byte(self.0[30])
    }

    pub fn chain_id(&self) -> u64 {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[22..30]);
        u64::from_be_bytes(id)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<B256> for Handle {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<Handle> for B256 {
    fn from(value: Handle) -> Self {
        value.0
    }
}

impl FromStr for Handle {
    type Err = HandleParseError;

    /// Accepts `0x`/`0X`-prefixed or bare hex in any letter case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(digits).map_err(|e| HandleParseError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HandleParseError::InvalidLength(bytes.len()))?;

        Ok(Self::new(array))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.to_hex())
    }
}
