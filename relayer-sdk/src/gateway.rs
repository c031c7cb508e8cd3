//! Encryption Gateway
//!
//! Turns a plaintext amount into a ciphertext handle plus an input proof that
//! binds it to one (contract, account) pair. The plaintext leaves the client
//! only sealed to the network key.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use fhevm_host::Handle;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::crypto;
use crate::error::SdkError;
use crate::transport::RelayerTransport;
use crate::types::{InputProofRequest, KeysResponse};

/// Handle and proof ready to pass to `record_salary`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handle: Handle,
    pub proof: Bytes,
}

pub struct EncryptionGateway {
    transport: Arc<dyn RelayerTransport>,
    keys: OnceCell<KeysResponse>,
}

impl EncryptionGateway {
    pub fn new(transport: Arc<dyn RelayerTransport>) -> Self {
        Self {
            transport,
            keys: OnceCell::new(),
        }
    }

    /// Fetch network keys; later calls return the cached keys
    pub async fn init(&self) -> Result<&KeysResponse, SdkError> {
        self.keys
            .get_or_try_init(|| async {
                let keys = self.transport.keys().await?;
                info!(chain_id = keys.chain_id, "Encryption gateway initialized");
                Ok(keys)
            })
            .await
    }

    pub fn is_ready(&self) -> bool {
        self.keys.initialized()
    }

    /// Network keys, or [`SdkError::EncryptionUnavailable`] before `init`
    pub fn keys(&self) -> Result<&KeysResponse, SdkError> {
        self.keys.get().ok_or(SdkError::EncryptionUnavailable)
    }

    /// Cached network keys, fetched now if an earlier attempt failed
    pub async fn ready_keys(&self) -> Result<&KeysResponse, SdkError> {
        self.init().await.map_err(|e| {
            warn!(error = %e, "Network keys unavailable");
            SdkError::EncryptionUnavailable
        })
    }

    /// Encrypt `plaintext` for `account` to submit to `contract`
    pub async fn encrypt(
        &self,
        contract: Address,
        account: Address,
        plaintext: u128,
    ) -> Result<EncryptedInput, SdkError> {
        let value = u64::try_from(plaintext)
            .map_err(|_| SdkError::InvalidPlaintext(plaintext.to_string()))?;
        let keys = self.ready_keys().await?;

        let sealed = crypto::seal(
            keys.network_public_key,
            &crypto::encode_u64(value),
            &crypto::input_aad(contract, account),
        )
        .map_err(|e| SdkError::Protocol(e.to_string()))?;

        let response = self
            .transport
            .input_proof(&InputProofRequest {
                contract_address: contract,
                user_address: account,
                ciphertext: sealed.into(),
            })
            .await?;

        debug!(%contract, %account, handle = %response.handle, "Input encrypted");

        Ok(EncryptedInput {
            handle: response.handle,
            proof: response.input_proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;

    #[tokio::test]
    async fn test_encrypt_retries_key_fetch_after_failure() {
        let stub = Arc::new(StubTransport::default());
        stub.fail_key_fetches(1);
        let gateway = EncryptionGateway::new(stub.clone());
        let (contract, account) = (Address::repeat_byte(0x50), Address::repeat_byte(0xA1));

        let err = gateway.encrypt(contract, account, 10).await.unwrap_err();
        assert_eq!(err, SdkError::EncryptionUnavailable);
        assert!(err.is_retryable());
        assert!(!gateway.is_ready());
        assert_eq!(gateway.keys(), Err(SdkError::EncryptionUnavailable));

        let input = gateway.encrypt(contract, account, 10).await.unwrap();
        assert_eq!(stub.registered_value(input.handle), Some(10));
        assert!(gateway.is_ready());
        assert_eq!(stub.key_calls(), 2);
    }

    #[tokio::test]
    async fn test_keys_fetched_once() {
        let stub = Arc::new(StubTransport::default());
        let gateway = EncryptionGateway::new(stub.clone());

        gateway.init().await.unwrap();
        gateway.ready_keys().await.unwrap();
        gateway
            .encrypt(Address::repeat_byte(0x50), Address::repeat_byte(0xA1), 1)
            .await
            .unwrap();

        assert_eq!(stub.key_calls(), 1);
    }

    #[tokio::test]
    async fn test_encrypt_rejects_wide_plaintext() {
        let gateway = EncryptionGateway::new(Arc::new(StubTransport::default()));
        gateway.init().await.unwrap();

        let err = gateway
            .encrypt(
                Address::repeat_byte(0x50),
                Address::repeat_byte(0xA1),
                u64::MAX as u128 + 1,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::InvalidPlaintext(_)));
    }

    #[tokio::test]
    async fn test_encrypt_seals_to_network_key() {
        let stub = Arc::new(StubTransport::default());
        let gateway = EncryptionGateway::new(stub.clone());
        gateway.init().await.unwrap();

        let contract = Address::repeat_byte(0x50);
        let account = Address::repeat_byte(0xA1);
        let input = gateway.encrypt(contract, account, 500_000).await.unwrap();

        assert!(!input.handle.is_zero());
        assert_eq!(stub.registered_value(input.handle), Some(500_000));
    }
}
