//! Services for the Relayer
//!
//! Development stand-ins for the FHE coprocessor, the KMS and the chain.

pub mod coprocessor;
pub mod devnet;
pub mod input_verifier;
pub mod kms;

pub use coprocessor::Coprocessor;
pub use devnet::Devnet;
pub use input_verifier::InputVerifier;
pub use kms::DecryptionDomain;
