//! # Confidential Payroll - Relayer SDK
//!
//! Client side of the confidential payroll protocol.
//!
//! ## Features
//!
//! - Encrypt plaintext salary amounts into handles bound to (contract, account)
//! - EIP-712 signed, time-windowed user decryption of handles
//! - Signed transactions against the payroll ledger
//! - Single-flight guards so one action cannot be submitted twice concurrently
//!
//! ## Usage
//!
//! ```no_run
//! use relayer_sdk::{ClientConfig, PayrollClient};
//!
//! # async fn run() -> Result<(), relayer_sdk::SdkError> {
//! let client = PayrollClient::connect(ClientConfig::from_env()?).await?;
//! client.record_salary("1250.50").await?;
//! let salary = client.decrypt_salary().await?;
//! println!("pending {}", relayer_sdk::amount::format_units(salary.pending));
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod client;
pub mod config;
pub mod crypto;
pub mod decrypt;
pub mod eip712;
pub mod error;
pub mod gateway;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{DecryptedSalary, PayrollClient};
pub use config::ClientConfig;
pub use decrypt::{DecryptionRequest, UserDecryptor, DECRYPT_DURATION_SECS};
pub use error::SdkError;
pub use gateway::{EncryptedInput, EncryptionGateway};
pub use transport::{HttpTransport, RelayerTransport};
