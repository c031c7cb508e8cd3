//! Client Configuration
//!
//! Loaded from environment variables (and `.env` when present).

use std::str::FromStr;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;

use crate::error::SdkError;

fn default_relayer_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the relayer
    pub relayer_url: String,
    /// Payroll ledger address; zero means "ask the relayer"
    pub payroll_address: Address,
    /// cUSDT address; zero means "ask the relayer"
    pub token_address: Address,
    /// Account key; without it only reads are possible
    pub signer: Option<PrivateKeySigner>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relayer_url: default_relayer_url(),
            payroll_address: Address::ZERO,
            token_address: Address::ZERO,
            signer: None,
        }
    }
}

impl ClientConfig {
    pub fn new(relayer_url: impl Into<String>) -> Self {
        Self {
            relayer_url: relayer_url.into(),
            ..Self::default()
        }
    }

    pub fn with_signer(mut self, signer: PrivateKeySigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Load from `RELAYER_URL`, `PAYROLL_ADDRESS`, `TOKEN_ADDRESS`, `PRIVATE_KEY`
    pub fn from_env() -> Result<Self, SdkError> {
        let _ = dotenvy::dotenv();

        let signer = match std::env::var("PRIVATE_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(
                PrivateKeySigner::from_str(key.trim())
                    .map_err(|e| SdkError::Config(format!("Invalid PRIVATE_KEY: {e}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            relayer_url: std::env::var("RELAYER_URL").unwrap_or_else(|_| default_relayer_url()),
            payroll_address: address_from_env("PAYROLL_ADDRESS")?,
            token_address: address_from_env("TOKEN_ADDRESS")?,
            signer,
        })
    }
}

fn address_from_env(var: &str) -> Result<Address, SdkError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Address::from_str(value.trim())
            .map_err(|e| SdkError::Config(format!("Invalid {var}: {e}"))),
        _ => Ok(Address::ZERO),
    }
}

/// False for the all-zero placeholder address
pub fn has_configured_address(address: &Address) -> bool {
    !address.is_zero()
}
