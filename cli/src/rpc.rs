// Ledger API
// JSON-RPC 2.0 client for a ledger node, behind the LedgerApi trait so
// commands can run against any backend.

use async_trait::async_trait;
use log::debug;
use pocketbook_wallet::{Address, TransferTx};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

/// Number of blocks a transaction stays valid after the current block
pub const VALIDITY_PERIOD_BLOCKS: u64 = 100;

const SYNC_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown network '{0}'. Check the networks section of the configuration")]
    UnknownNetwork(String),

    #[error("Network {network} is not currently available: {reason}")]
    NetworkUnavailable { network: String, reason: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Transaction 0x{digest} failed with status {status}")]
    TransactionFailed { digest: String, status: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.url().map_or_else(|| "request".to_string(), |u| u.to_string()))
        } else if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Operations the wallet needs from a ledger node. Amounts are canonical.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn balance(&self, address: &Address) -> Result<u64, ApiError>;

    async fn stake(&self, address: &Address) -> Result<u64, ApiError>;

    /// Set the transaction's validity window relative to the current block
    async fn set_validity_period(&self, tx: &mut TransferTx) -> Result<(), ApiError>;

    /// Submit a signed transaction, returning its hex digest
    async fn submit_signed_tx(&self, tx: &TransferTx) -> Result<String, ApiError>;

    /// Wait until the transaction has been executed
    async fn sync(&self, tx_digest: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TxStatus {
    status: String,
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    url: String,
    confirmation_timeout: Duration,
}

impl RpcClient {
    pub fn new(url: &str, timeout: u64, confirmation_timeout: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            confirmation_timeout: Duration::from_secs(confirmation_timeout),
        })
    }

    async fn call<T>(&self, method: &str, params: serde_json::Value) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };
        debug!("RPC {} -> {}", method, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let rpc_response: RpcResponse<T> = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(ApiError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| ApiError::InvalidResponse(format!("Empty result for {}", method)))
    }

    pub async fn ping(&self) -> Result<(), ApiError> {
        self.call::<serde_json::Value>("get_status", json!([])).await?;
        Ok(())
    }

    pub async fn block_number(&self) -> Result<u64, ApiError> {
        self.call("get_block_number", json!([])).await
    }
}

#[async_trait]
impl LedgerApi for RpcClient {
    async fn balance(&self, address: &Address) -> Result<u64, ApiError> {
        self.call("get_balance", json!([address.to_string()])).await
    }

    async fn stake(&self, address: &Address) -> Result<u64, ApiError> {
        self.call("get_stake", json!([address.to_string()])).await
    }

    async fn set_validity_period(&self, tx: &mut TransferTx) -> Result<(), ApiError> {
        let current = self.block_number().await?;
        tx.set_validity_period(current, current.saturating_add(VALIDITY_PERIOD_BLOCKS))
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn submit_signed_tx(&self, tx: &TransferTx) -> Result<String, ApiError> {
        let digest: String = self.call("submit_tx", json!([tx])).await?;
        Ok(digest.trim_start_matches("0x").to_string())
    }

    async fn sync(&self, tx_digest: &str) -> Result<(), ApiError> {
        let deadline = tokio::time::Instant::now() + self.confirmation_timeout;

        loop {
            let status: TxStatus = self.call("get_tx_status", json!([tx_digest])).await?;
            debug!("Transaction 0x{} status: {}", tx_digest, status.status);

            match status.status.as_str() {
                "Executed" => return Ok(()),
                "Unknown" | "Pending" | "Submitted" => {}
                _ => {
                    return Err(ApiError::TransactionFailed {
                        digest: tx_digest.to_string(),
                        status: status.status,
                    })
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ApiError::Timeout(format!("transaction 0x{}", tx_digest)));
            }
            tokio::time::sleep(SYNC_POLL_INTERVAL).await;
        }
    }
}

/// Build a client for a configured network. An unknown network name is a
/// configuration error; a node that does not answer is `NetworkUnavailable`.
pub async fn create_api(network: &str, config: &Config) -> Result<Box<dyn LedgerApi>, ApiError> {
    let settings = config
        .network(network)
        .ok_or_else(|| ApiError::UnknownNetwork(network.to_string()))?;

    let client = RpcClient::new(&settings.rpc_url, config.timeout, config.confirmation_timeout)?;
    client
        .ping()
        .await
        .map_err(|e| ApiError::NetworkUnavailable {
            network: network.to_string(),
            reason: e.to_string(),
        })?;

    debug!("Connected to {} at {}", network, settings.rpc_url);
    Ok(Box::new(client))
}
