//! Payroll client
//!
//! Orchestrates the employee-facing actions against the relayer:
//! record salary, claim salary, read handles, decrypt salary and balance.
//!
//! Each action is single-flight: while one is running, starting the same
//! action again fails with [`SdkError::ActionInFlight`]. Nothing is retried
//! automatically. Different actions may run concurrently; their transactions
//! are still submitted one at a time so each signs a fresh nonce.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use alloy_signer_local::PrivateKeySigner;
use fhevm_host::Handle;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::amount;
use crate::config::{has_configured_address, ClientConfig};
use crate::decrypt::{DecryptionRequest, UserDecryptor};
use crate::eip712;
use crate::error::SdkError;
use crate::gateway::EncryptionGateway;
use crate::transport::{HttpTransport, RelayerTransport};
use crate::types::{
    SalaryResponse, SignedTransaction, TransactionPayload, TransactionReceipt, TxMethod,
};

/// Plaintext salary figures in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptedSalary {
    pub pending: u64,
    pub total: u64,
}

// ==================== Single-flight ====================

struct InFlight {
    busy: AtomicBool,
    action: &'static str,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl InFlight {
    const fn new(action: &'static str) -> Self {
        Self {
            busy: AtomicBool::new(false),
            action,
        }
    }

    fn acquire(&self) -> Result<InFlightGuard<'_>, SdkError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(&self.busy))
            .map_err(|_| SdkError::ActionInFlight(self.action))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ==================== Client ====================

pub struct PayrollClient {
    transport: Arc<dyn RelayerTransport>,
    gateway: EncryptionGateway,
    decryptor: UserDecryptor,
    signer: Option<PrivateKeySigner>,
    payroll: Address,
    token: Address,
    recording: InFlight,
    claiming: InFlight,
    decrypting_salary: InFlight,
    decrypting_balance: InFlight,
    /// Held from nonce lookup until the transaction is accepted or rejected
    submitting: Mutex<()>,
}

impl PayrollClient {
    /// Connect over HTTP to `config.relayer_url`
    pub async fn connect(config: ClientConfig) -> Result<Self, SdkError> {
        let transport = Arc::new(HttpTransport::new(config.relayer_url.clone()));
        Self::with_transport(config, transport).await
    }

    /// Build a client over any transport.
    ///
    /// Unconfigured contract addresses are looked up from the relayer. A
    /// failure to fetch network keys is not fatal: the next action that
    /// needs them fetches them again.
    pub async fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn RelayerTransport>,
    ) -> Result<Self, SdkError> {
        let (mut payroll, mut token) = (config.payroll_address, config.token_address);
        if !has_configured_address(&payroll) || !has_configured_address(&token) {
            let deployed = transport.contracts().await?;
            if !has_configured_address(&payroll) {
                payroll = deployed.payroll;
            }
            if !has_configured_address(&token) {
                token = deployed.token;
            }
        }

        let client = Self {
            gateway: EncryptionGateway::new(transport.clone()),
            decryptor: UserDecryptor::new(transport.clone()),
            transport,
            signer: config.signer,
            payroll,
            token,
            recording: InFlight::new("Recording salary"),
            claiming: InFlight::new("Claiming salary"),
            decrypting_salary: InFlight::new("Decrypting salary"),
            decrypting_balance: InFlight::new("Decrypting balance"),
            submitting: Mutex::new(()),
        };

        if let Err(e) = client.init_encryption().await {
            warn!(error = %e, "Encryption service not ready");
        }

        info!(payroll = %client.payroll, token = %client.token, "Payroll client ready");
        Ok(client)
    }

    pub async fn init_encryption(&self) -> Result<(), SdkError> {
        self.gateway.init().await.map(|_| ())
    }

    pub fn payroll_address(&self) -> Address {
        self.payroll
    }

    pub fn token_address(&self) -> Address {
        self.token
    }

    /// Address of the configured signer
    pub fn account(&self) -> Result<Address, SdkError> {
        self.signer
            .as_ref()
            .map(|s| s.address())
            .ok_or(SdkError::SignerUnavailable)
    }

    // ==================== Writes ====================

    /// Record a decimal cUSDT amount such as `"1250.50"`
    pub async fn record_salary(&self, amount: &str) -> Result<TransactionReceipt, SdkError> {
        let units = amount::parse_units(amount)?;
        self.record_salary_units(units).await
    }

    /// Record an amount already scaled to base units
    pub async fn record_salary_units(&self, units: u64) -> Result<TransactionReceipt, SdkError> {
        let _guard = self.recording.acquire()?;
        let account = self.account()?;
        self.require_payroll()?;

        let input = self
            .gateway
            .encrypt(self.payroll, account, u128::from(units))
            .await?;
        let receipt = self
            .send_transaction(TxMethod::RecordSalary, input.handle, input.proof)
            .await?;

        info!(%account, tx_hash = %receipt.tx_hash, "Salary recorded");
        Ok(receipt)
    }

    /// Claim all pending salary as cUSDT
    pub async fn claim_salary(&self) -> Result<TransactionReceipt, SdkError> {
        let _guard = self.claiming.acquire()?;
        let account = self.account()?;
        self.require_payroll()?;

        let receipt = self
            .send_transaction(TxMethod::ClaimSalary, Handle::ZERO, Bytes::new())
            .await?;

        info!(%account, tx_hash = %receipt.tx_hash, "Salary claimed");
        Ok(receipt)
    }

    async fn send_transaction(
        &self,
        method: TxMethod,
        handle: Handle,
        proof: Bytes,
    ) -> Result<TransactionReceipt, SdkError> {
        let signer = self.signer.as_ref().ok_or(SdkError::SignerUnavailable)?;
        let chain_id = self.gateway.ready_keys().await?.chain_id;
        let from = signer.address();

        let _submitting = self.submitting.lock().await;

        let transaction = TransactionPayload {
            from,
            to: self.payroll,
            nonce: self.transport.nonce(from).await?,
            method,
            handle,
            proof,
        };
        let hash = eip712::transaction_hash(&eip712::transaction_domain(chain_id), &transaction);
        let signature = eip712::sign_hash(signer, hash)?;

        self.transport
            .submit_transaction(&SignedTransaction {
                transaction,
                signature,
            })
            .await
    }

    // ==================== Reads ====================

    /// Encrypted `(pending, total)` for the connected account
    pub async fn salary(&self) -> Result<SalaryResponse, SdkError> {
        self.salary_of(self.account()?).await
    }

    pub async fn salary_of(&self, account: Address) -> Result<SalaryResponse, SdkError> {
        self.require_payroll()?;
        self.transport.salary(account).await
    }

    /// Encrypted cUSDT balance of the connected account
    pub async fn balance(&self) -> Result<Handle, SdkError> {
        let account = self.account()?;
        Ok(self.transport.balance(account).await?.balance)
    }

    // ==================== Decryption ====================

    pub async fn decrypt_salary(&self) -> Result<DecryptedSalary, SdkError> {
        let _guard = self.decrypting_salary.acquire()?;
        let salary = self.salary().await?;
        if salary.pending.is_zero() && salary.total.is_zero() {
            return Ok(DecryptedSalary { pending: 0, total: 0 });
        }
        let keys = self.gateway.ready_keys().await?;

        let request = DecryptionRequest::new()
            .with(salary.pending, self.payroll)
            .with(salary.total, self.payroll);
        let values = self
            .decryptor
            .decrypt(keys, self.signer.as_ref(), &request)
            .await?;

        Ok(DecryptedSalary {
            pending: values.get(&salary.pending).copied().unwrap_or_default(),
            total: values.get(&salary.total).copied().unwrap_or_default(),
        })
    }

    pub async fn decrypt_balance(&self) -> Result<u64, SdkError> {
        let _guard = self.decrypting_balance.acquire()?;
        let balance = self.balance().await?;
        if balance.is_zero() {
            return Ok(0);
        }
        let keys = self.gateway.ready_keys().await?;

        let request = DecryptionRequest::new().with(balance, self.token);
        let values = self
            .decryptor
            .decrypt(keys, self.signer.as_ref(), &request)
            .await?;

        Ok(values.get(&balance).copied().unwrap_or_default())
    }

    fn require_payroll(&self) -> Result<(), SdkError> {
        if has_configured_address(&self.payroll) {
            Ok(())
        } else {
            Err(SdkError::Config(
                "Payroll contract address is not configured".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;

    fn configured() -> ClientConfig {
        ClientConfig {
            payroll_address: Address::repeat_byte(0x50),
            token_address: Address::repeat_byte(0x70),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_in_flight_guard() {
        let flag = InFlight::new("Claiming salary");

        let guard = flag.acquire().unwrap();
        assert_eq!(
            flag.acquire().err(),
            Some(SdkError::ActionInFlight("Claiming salary"))
        );

        drop(guard);
        assert!(flag.acquire().is_ok());
    }

    #[tokio::test]
    async fn test_writes_require_signer() {
        let client = PayrollClient::with_transport(configured(), Arc::new(StubTransport::default()))
            .await
            .unwrap();

        assert_eq!(client.account(), Err(SdkError::SignerUnavailable));
        assert_eq!(
            client.claim_salary().await.unwrap_err(),
            SdkError::SignerUnavailable
        );
        // The guard is released after a failed action
        assert_eq!(
            client.claim_salary().await.unwrap_err(),
            SdkError::SignerUnavailable
        );
    }

    #[tokio::test]
    async fn test_record_rejects_bad_amount_before_network() {
        let client = PayrollClient::with_transport(
            configured().with_signer(PrivateKeySigner::random()),
            Arc::new(StubTransport::default()),
        )
        .await
        .unwrap();

        assert!(matches!(
            client.record_salary("").await,
            Err(SdkError::InvalidAmount(_))
        ));
        assert!(matches!(
            client.record_salary("1.0000001").await,
            Err(SdkError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_fresh_account_decrypts_to_zero() {
        let stub = Arc::new(StubTransport::default());
        let client = PayrollClient::with_transport(
            configured().with_signer(PrivateKeySigner::random()),
            stub.clone(),
        )
        .await
        .unwrap();

        let salary = client.decrypt_salary().await.unwrap();
        assert_eq!(salary, DecryptedSalary { pending: 0, total: 0 });
        assert_eq!(client.decrypt_balance().await.unwrap(), 0);
        assert_eq!(stub.decrypt_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_handles_decrypt_without_network_keys() {
        let stub = Arc::new(StubTransport::default());
        stub.fail_key_fetches(usize::MAX);
        let client = PayrollClient::with_transport(
            configured().with_signer(PrivateKeySigner::random()),
            stub.clone(),
        )
        .await
        .unwrap();

        assert_eq!(
            client.decrypt_salary().await,
            Ok(DecryptedSalary { pending: 0, total: 0 })
        );
        assert_eq!(client.decrypt_balance().await, Ok(0));
        // Only the attempt made while connecting
        assert_eq!(stub.key_calls(), 1);
        assert_eq!(stub.decrypt_calls(), 0);
    }

    #[tokio::test]
    async fn test_record_retries_key_fetch_after_failed_connect() {
        let stub = Arc::new(StubTransport::default());
        stub.fail_key_fetches(2);
        let signer = PrivateKeySigner::random();
        let client =
            PayrollClient::with_transport(configured().with_signer(signer.clone()), stub.clone())
                .await
                .unwrap();

        let err = client.record_salary_units(5).await.unwrap_err();
        assert_eq!(err, SdkError::EncryptionUnavailable);
        assert!(err.is_retryable());

        let receipt = client.record_salary_units(5).await.unwrap();
        assert_eq!(receipt.nonce, 0);
        assert_eq!(stub.key_calls(), 3);
        assert_eq!(stub.committed_nonce(signer.address()), 1);
    }

    #[tokio::test]
    async fn test_concurrent_record_and_claim_use_distinct_nonces() {
        let stub = Arc::new(StubTransport::default());
        let signer = PrivateKeySigner::random();
        let client =
            PayrollClient::with_transport(configured().with_signer(signer.clone()), stub.clone())
                .await
                .unwrap();

        for round in 0..10u64 {
            let (recorded, claimed) =
                tokio::join!(client.record_salary_units(5), client.claim_salary());
            recorded.unwrap();
            claimed.unwrap();
            assert_eq!(stub.committed_nonce(signer.address()), 2 * (round + 1));
        }
    }
}
