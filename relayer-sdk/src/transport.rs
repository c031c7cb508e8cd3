//! Relayer transport
//!
//! [`RelayerTransport`] is the seam between client logic and the network;
//! [`HttpTransport`] talks to the relayer's REST API with `reqwest`.

use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::SdkError;
use crate::types::{
    BalanceResponse, ContractsResponse, ErrorResponse, InputProofRequest, InputProofResponse,
    KeysResponse, NonceResponse, SalaryResponse, SignedTransaction, TransactionReceipt,
    UserDecryptRequest, UserDecryptResponse,
};

#[async_trait]
pub trait RelayerTransport: Send + Sync {
    async fn keys(&self) -> Result<KeysResponse, SdkError>;

    async fn contracts(&self) -> Result<ContractsResponse, SdkError>;

    async fn input_proof(&self, request: &InputProofRequest) -> Result<InputProofResponse, SdkError>;

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<UserDecryptResponse, SdkError>;

    async fn nonce(&self, account: Address) -> Result<u64, SdkError>;

    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<TransactionReceipt, SdkError>;

    async fn salary(&self, account: Address) -> Result<SalaryResponse, SdkError>;

    async fn balance(&self, account: Address) -> Result<BalanceResponse, SdkError>;
}

pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SdkError> {
        debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| SdkError::BackendUnreachable(e.to_string()))?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SdkError> {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| SdkError::BackendUnreachable(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SdkError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| SdkError::Protocol(e.to_string()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SdkError::BackendUnreachable(e.to_string()))?;
        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(error) => Err(error.into()),
            Err(_) if status.is_server_error() => {
                Err(SdkError::BackendUnreachable(format!("relayer returned {status}")))
            }
            Err(_) => Err(SdkError::Protocol(format!("relayer returned {status}"))),
        }
    }
}

#[async_trait]
impl RelayerTransport for HttpTransport {
    async fn keys(&self) -> Result<KeysResponse, SdkError> {
        self.get("/api/v1/keys").await
    }

    async fn contracts(&self) -> Result<ContractsResponse, SdkError> {
        self.get("/api/v1/contracts").await
    }

    async fn input_proof(&self, request: &InputProofRequest) -> Result<InputProofResponse, SdkError> {
        self.post("/api/v1/input-proof", request).await
    }

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<UserDecryptResponse, SdkError> {
        self.post("/api/v1/user-decrypt", request).await
    }

    async fn nonce(&self, account: Address) -> Result<u64, SdkError> {
        let response: NonceResponse = self
            .get(&format!("/api/v1/accounts/{account}/nonce"))
            .await?;
        Ok(response.nonce)
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<TransactionReceipt, SdkError> {
        self.post("/api/v1/transactions", tx).await
    }

    async fn salary(&self, account: Address) -> Result<SalaryResponse, SdkError> {
        self.get(&format!("/api/v1/payroll/salary/{account}")).await
    }

    async fn balance(&self, account: Address) -> Result<BalanceResponse, SdkError> {
        self.get(&format!("/api/v1/token/balance/{account}")).await
    }
}
