//! Relayer Configuration
//!
//! Loaded in layers: `.env` (via dotenvy), then an optional `relayer.toml`,
//! then `RELAYER_*` environment variables, e.g. `RELAYER_PORT=4000`.

use std::net::SocketAddr;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::Deserialize;
use thiserror::Error;

use crate::services::devnet::default_deployer;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Invalid socket address {0}")]
    InvalidSocketAddr(String),
    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Relayer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Chain id stamped into handles and EIP-712 domains
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// X25519 network secret (hex); generated when absent
    pub network_secret_key: Option<String>,

    /// Ed25519 input verifier secret (hex); generated when absent
    pub input_verifier_secret_key: Option<String>,

    /// Account that deploys the devnet contracts
    pub deployer: Option<String>,

    /// `verifyingContract` of the decryption EIP-712 domain
    pub decryption_verifier: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_chain_id() -> u64 {
    31337
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            chain_id: default_chain_id(),
            log_level: default_log_level(),
            json_logs: false,
            cors_origins: default_cors_origins(),
            network_secret_key: None,
            input_verifier_secret_key: None,
            deployer: None,
            decryption_verifier: None,
        }
    }
}

impl Config {
    /// Load `.env`, `relayer.toml` and `RELAYER_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = ::config::Config::builder()
            .add_source(::config::File::with_name("relayer").required(false))
            .add_source(
                ::config::Environment::with_prefix("RELAYER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidSocketAddr(addr))
    }

    pub fn deployer_address(&self) -> Result<Address, ConfigError> {
        parse_address("deployer", self.deployer.as_deref()).map(|a| a.unwrap_or_else(default_deployer))
    }

    pub fn decryption_verifier_address(&self) -> Result<Address, ConfigError> {
        match parse_address("decryption_verifier", self.decryption_verifier.as_deref())? {
            Some(address) => Ok(address),
            None => Ok(self.deployer_address()?.create(2)),
        }
    }

    /// 32-byte network secret, random when unset
    pub fn network_secret(&self) -> Result<[u8; 32], ConfigError> {
        match self.network_secret_key.as_deref() {
            Some(hex) => parse_secret("network_secret_key", hex),
            None => Ok(rand::random()),
        }
    }
}

fn parse_address(field: &'static str, value: Option<&str>) -> Result<Option<Address>, ConfigError> {
    value
        .map(|v| {
            Address::from_str(v.trim()).map_err(|e| ConfigError::InvalidValue {
                field,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_secret(field: &'static str, value: &str) -> Result<[u8; 32], ConfigError> {
    hex::decode(value.trim().trim_start_matches("0x"))
        .map_err(|e| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        })?
        .try_into()
        .map_err(|_| ConfigError::InvalidValue {
            field,
            reason: "must be 32 bytes".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
        assert_eq!(config.deployer_address().unwrap(), default_deployer());
        assert_eq!(
            config.decryption_verifier_address().unwrap(),
            default_deployer().create(2)
        );
    }

    #[test]
    fn test_invalid_values() {
        let config = Config {
            host: "not a host".to_string(),
            deployer: Some("0x1234".to_string()),
            network_secret_key: Some("abcd".to_string()),
            ..Config::default()
        };

        assert!(matches!(config.socket_addr(), Err(ConfigError::InvalidSocketAddr(_))));
        assert!(matches!(
            config.deployer_address(),
            Err(ConfigError::InvalidValue { field: "deployer", .. })
        ));
        assert!(config.network_secret().is_err());
    }

    #[test]
    fn test_network_secret_from_hex() {
        let config = Config {
            network_secret_key: Some(format!("0x{}", hex::encode([7u8; 32]))),
            ..Config::default()
        };
        assert_eq!(config.network_secret().unwrap(), [7u8; 32]);
    }
}
