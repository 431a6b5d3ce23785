//! Node access: the [`NodeClient`] seam and its JSON-RPC implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::RpcError;
use crate::types::{
    AccountId, AccountView, CryptoHash, SignedTransaction, SubmitResponse, TransactionStatusView,
    ViewFunctionResult,
};

/// The node operations the transaction pipeline consumes.
///
/// [`RpcClient`] implements this over JSON-RPC 2.0. Tests substitute an
/// in-process ledger.
pub trait NodeClient: Send + Sync {
    /// Current on-chain state of an account.
    fn view_account<'a>(
        &'a self,
        account_id: &'a AccountId,
    ) -> BoxFuture<'a, Result<AccountView, RpcError>>;

    /// Hand a signed transaction to the node. Returns once the node has
    /// acknowledged receipt, not once it has executed.
    fn submit_transaction<'a>(
        &'a self,
        signed_tx: &'a SignedTransaction,
    ) -> BoxFuture<'a, Result<CryptoHash, RpcError>>;

    /// Execution status of a previously submitted transaction.
    fn transaction_status<'a>(
        &'a self,
        hash: &'a CryptoHash,
    ) -> BoxFuture<'a, Result<TransactionStatusView, RpcError>>;

    /// Run a read-only contract method.
    fn call_view_function<'a>(
        &'a self,
        contract_id: &'a AccountId,
        method_name: &'a str,
        args: &'a [u8],
    ) -> BoxFuture<'a, Result<ViewFunctionResult, RpcError>>;
}

/// Retry configuration for read-path RPC calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// No retries; every call is a single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(
            self.initial_delay_ms
                .saturating_mul(factor)
                .min(self.max_delay_ms),
        )
    }
}

/// JSON-RPC request structure.
#[derive(Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

/// JSON-RPC response structure.
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// Structured node error: `{code, message, data, cause: {name, info}}`.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    cause: Option<ErrorCause>,
}

#[derive(Debug, Deserialize)]
struct ErrorCause {
    name: String,
    #[serde(default)]
    info: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 client for a node.
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
    retry_config: RetryConfig,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a new RPC client with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_retry_config(url, RetryConfig::default())
    }

    /// Create a new RPC client with custom retry configuration.
    pub fn with_retry_config(url: impl Into<String>, retry_config: RetryConfig) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            retry_config,
            request_id: AtomicU64::new(0),
        }
    }

    /// Get the RPC URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a raw RPC call, retrying transient failures per [`RetryConfig`].
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let total_attempts = self.retry_config.max_retries + 1;

        for attempt in 0..total_attempts {
            match self.call_once(method, &params).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt + 1 < total_attempts => {
                    let delay = self.retry_config.delay(attempt);
                    warn!(
                        method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying RPC call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(RpcError::Timeout(total_attempts))
    }

    /// Single attempt, no retry.
    pub async fn call_once<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RpcError::network(
                format!("HTTP {}: {}", status, body),
                Some(status.as_u16()),
                is_retryable_status(status.as_u16()),
            ));
        }

        let rpc_response: JsonRpcResponse<R> = serde_json::from_str(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(parse_rpc_error(&error));
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse("Missing result in response".to_string()))
    }

    /// View account information.
    pub async fn view_account(&self, account_id: &AccountId) -> Result<AccountView, RpcError> {
        self.call(
            "view_account",
            serde_json::json!({ "account_id": account_id }),
        )
        .await
    }

    /// Submit a signed transaction. Never retried: a second send of the same
    /// bytes is a replay the node would reject.
    pub async fn submit_transaction(
        &self,
        signed_tx: &SignedTransaction,
    ) -> Result<CryptoHash, RpcError> {
        let signed_tx_base64 = signed_tx
            .to_base64()
            .map_err(|e| RpcError::Encode(e.to_string()))?;
        let response: SubmitResponse = self
            .call_once(
                "submit_transaction",
                serde_json::json!({ "signed_tx_base64": signed_tx_base64 }),
            )
            .await?;
        debug!(hash = %response.hash, "node acknowledged transaction");
        Ok(response.hash)
    }

    /// Get the execution status of a transaction.
    pub async fn transaction_status(
        &self,
        hash: &CryptoHash,
    ) -> Result<TransactionStatusView, RpcError> {
        self.call("tx_status", serde_json::json!({ "hash": hash }))
            .await
    }

    /// Call a view function on a contract.
    pub async fn call_view_function(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: &[u8],
    ) -> Result<ViewFunctionResult, RpcError> {
        self.call(
            "call_view_function",
            serde_json::json!({
                "account_id": contract_id,
                "method_name": method_name,
                "args_base64": STANDARD.encode(args),
            }),
        )
        .await
    }
}

impl NodeClient for RpcClient {
    fn view_account<'a>(
        &'a self,
        account_id: &'a AccountId,
    ) -> BoxFuture<'a, Result<AccountView, RpcError>> {
        Box::pin(RpcClient::view_account(self, account_id))
    }

    fn submit_transaction<'a>(
        &'a self,
        signed_tx: &'a SignedTransaction,
    ) -> BoxFuture<'a, Result<CryptoHash, RpcError>> {
        Box::pin(RpcClient::submit_transaction(self, signed_tx))
    }

    fn transaction_status<'a>(
        &'a self,
        hash: &'a CryptoHash,
    ) -> BoxFuture<'a, Result<TransactionStatusView, RpcError>> {
        Box::pin(RpcClient::transaction_status(self, hash))
    }

    fn call_view_function<'a>(
        &'a self,
        contract_id: &'a AccountId,
        method_name: &'a str,
        args: &'a [u8],
    ) -> BoxFuture<'a, Result<ViewFunctionResult, RpcError>> {
        Box::pin(RpcClient::call_view_function(
            self,
            contract_id,
            method_name,
            args,
        ))
    }
}

impl Clone for RpcClient {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            client: self.client.clone(),
            retry_config: self.retry_config.clone(),
            request_id: AtomicU64::new(0),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Map a structured node error onto [`RpcError`].
fn parse_rpc_error(error: &JsonRpcError) -> RpcError {
    let info = error.cause.as_ref().and_then(|c| c.info.as_ref());
    let info_str = |key: &str| info.and_then(|i| i.get(key)).and_then(|v| v.as_str());

    if let Some(cause) = &error.cause {
        match cause.name.as_str() {
            "UNKNOWN_ACCOUNT" => {
                if let Some(Ok(account_id)) =
                    info_str("requested_account_id").map(str::parse::<AccountId>)
                {
                    return RpcError::AccountNotFound(account_id);
                }
            }
            "UNKNOWN_TRANSACTION" => {
                let hash = info_str("transaction_hash").unwrap_or(&error.message);
                return RpcError::UnknownTransaction(hash.to_string());
            }
            "INVALID_TRANSACTION" => {
                if let Some(invalid_nonce) = error.data.as_ref().and_then(extract_invalid_nonce) {
                    return invalid_nonce;
                }
                return RpcError::invalid_transaction(&error.message, error.data.clone());
            }
            "CONTRACT_EXECUTION_ERROR" => {
                if let Some(Ok(contract_id)) = info_str("contract_id").map(str::parse::<AccountId>)
                {
                    let logs = info
                        .and_then(|i| i.get("logs"))
                        .and_then(|l| serde_json::from_value(l.clone()).ok())
                        .unwrap_or_default();
                    return RpcError::function_call(
                        contract_id,
                        info_str("method_name").unwrap_or("unknown"),
                        error
                            .data
                            .as_ref()
                            .and_then(|d| d.as_str())
                            .unwrap_or(&error.message),
                        logs,
                    );
                }
            }
            "TIMEOUT_ERROR" => {
                return RpcError::RequestTimeout(error.message.clone());
            }
            "PARSE_ERROR" => {
                return RpcError::ParseError(error.message.clone());
            }
            "INTERNAL_ERROR" => {
                return RpcError::InternalError(error.message.clone());
            }
            _ => {}
        }
    }

    // Older nodes report missing accounts only in the data string:
    // "account X does not exist while viewing"
    if let Some(account_id) = error
        .data
        .as_ref()
        .and_then(|d| d.as_str())
        .filter(|s| s.contains("does not exist"))
        .and_then(|s| s.strip_prefix("account "))
        .and_then(|s| s.split_whitespace().next())
        .and_then(|s| s.parse::<AccountId>().ok())
    {
        return RpcError::AccountNotFound(account_id);
    }

    RpcError::Rpc {
        code: error.code,
        message: error.message.clone(),
        data: error.data.clone(),
    }
}

/// Check if an HTTP status code is retryable.
fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// Find `InvalidTxError.InvalidNonce` in error data, with or without the
/// `TxExecutionError` wrapper.
fn extract_invalid_nonce(data: &serde_json::Value) -> Option<RpcError> {
    let invalid_tx_error = data
        .get("TxExecutionError")
        .unwrap_or(data)
        .get("InvalidTxError")?;
    let invalid_nonce = invalid_tx_error.get("InvalidNonce")?;

    let ak_nonce = invalid_nonce.get("ak_nonce")?.as_u64()?;
    let tx_nonce = invalid_nonce.get("tx_nonce")?.as_u64()?;

    Some(RpcError::InvalidNonce { tx_nonce, ak_nonce })
}
