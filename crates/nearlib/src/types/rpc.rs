//! Node response types.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use super::{AccountId, CryptoHash, NearToken};

// ============================================================================
// Account types
// ============================================================================

/// Account information from `view_account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub account_id: AccountId,
    /// Highest nonce the account has used.
    pub nonce: u64,
    /// Liquid balance.
    pub amount: NearToken,
    /// Hash of deployed contract code (zero if none).
    pub code_hash: CryptoHash,
    /// Staked balance.
    pub stake: NearToken,
}

impl AccountView {
    /// Check if this account has a deployed contract.
    pub fn has_contract(&self) -> bool {
        !self.code_hash.is_zero()
    }
}

// ============================================================================
// Transaction types
// ============================================================================

/// Acknowledgement returned by `submit_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: CryptoHash,
}

/// Execution status reported by `tx_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Known to the node, not yet final.
    Pending,
    Completed,
    Failed,
}

/// Response of `tx_status`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatusView {
    pub status: TxStatus,
    /// Return value of a completed execution.
    #[serde_as(as = "Option<Base64>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<u8>>,
    /// Failure reason of a failed execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Contract log lines in emission order.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl TransactionStatusView {
    pub fn pending() -> Self {
        Self {
            status: TxStatus::Pending,
            value: None,
            failure: None,
            logs: Vec::new(),
        }
    }
}

// ============================================================================
// View function types
// ============================================================================

/// Result of `call_view_function`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFunctionResult {
    /// Result bytes (usually JSON).
    #[serde_as(as = "Base64")]
    pub result: Vec<u8>,
    /// Logs emitted during the view call.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl ViewFunctionResult {
    /// Get the result as raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.result
    }

    /// Deserialize the result as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.result)
    }
}
