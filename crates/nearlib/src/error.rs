//! Error types for nearlib.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error) - Main error type, returned by most operations
//!   - [`RpcError`] - Node and transport errors (network, unknown account, etc.)
//!   - [`ParseAccountIdError`] - Invalid account ID format
//!   - [`ParseAmountError`] - Invalid token amount format
//!   - [`ParseKeyError`] - Invalid key format
//!   - [`ParseHashError`] - Invalid transaction hash
//!   - [`SignerError`] - Seed phrase and key derivation failures
//!   - [`KeyStoreError`] - Credential loading failures
//!
//! # Pipeline Failures
//!
//! Transactions fail at one of four stages:
//!
//! | Stage | Variant | Meaning |
//! |-------|---------|---------|
//! | Construction | [`Error::KeyNotFound`], [`Error::InvalidIntent`] | Nothing was sent |
//! | Submission | [`Error::RpcUnreachable`], [`Error::RejectedBySyntax`] | The node never queued it |
//! | Submission | [`Error::SubmissionUnconfirmed`] | The node answered ambiguously; may still land |
//! | Execution | [`Error::ExecutionFailed`] | Known failed, logs attached |
//! | Polling | [`Error::AmbiguousTimeout`] | Stopped checking; may still land |
//!
//! ```rust,no_run
//! use nearlib::{Error, Near, NearToken};
//!
//! # async fn example(near: Near) -> Result<(), Error> {
//! let alice = near.account("alice.near")?;
//! match alice.send_money("bob.near", NearToken::yocto(1)).await {
//!     Ok(_) => println!("sent"),
//!     Err(e) if e.is_ambiguous() => println!("unknown, check {e} later"),
//!     Err(e) if e.is_known_failure() => println!("did not happen: {e}"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::types::{AccountId, CryptoHash};

/// Error parsing an account ID.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAccountIdError {
    #[error("Account ID is empty")]
    Empty,

    #[error("Account ID '{0}' is too long (max 64 characters)")]
    TooLong(String),

    #[error("Account ID '{0}' is too short (min 2 characters for named accounts)")]
    TooShort(String),

    #[error("Account ID '{0}' contains invalid character '{1}'")]
    InvalidChar(String, char),

    #[error("Account ID '{0}' has invalid format")]
    InvalidFormat(String),
}

/// Error parsing a token amount.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("Ambiguous amount '{0}'. Use explicit units like '5 NEAR' or '1000 yocto'")]
    AmbiguousAmount(String),

    #[error("Invalid amount format: '{0}'")]
    InvalidFormat(String),

    #[error("Invalid number in amount: '{0}'")]
    InvalidNumber(String),

    #[error("Amount overflow: value too large")]
    Overflow,
}

/// Error parsing a public or secret key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseKeyError {
    #[error("Invalid key format: expected 'ed25519:<base58>' or bare base58")]
    InvalidFormat,

    #[error("Unknown key type: '{0}'")]
    UnknownKeyType(String),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid curve point: key bytes do not represent a valid point on the curve")]
    InvalidCurvePoint,
}

/// Error parsing a crypto hash.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseHashError {
    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Error deriving key material.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("Invalid seed phrase")]
    InvalidSeedPhrase,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),
}

/// Error during keystore operations.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid credential format: {0}")]
    InvalidFormat(String),

    #[error("Invalid key: {0}")]
    InvalidKey(#[from] ParseKeyError),

    #[error("Path error: {0}")]
    PathError(String),
}

// ============================================================================
// RPC Errors
// ============================================================================

/// Node and transport errors.
#[derive(Debug, Error)]
pub enum RpcError {
    // ─── Network/Transport ───
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    #[error("Timeout after {0} retries")]
    Timeout(u32),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),

    // ─── Generic RPC Error ───
    #[error("RPC error: {message} (code: {code})")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    // ─── Queries ───
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Transaction not found: {0}")]
    UnknownTransaction(String),

    #[error("Function call error on {contract_id}.{method_name}: {message}")]
    FunctionCall {
        contract_id: AccountId,
        method_name: String,
        message: String,
        logs: Vec<String>,
    },

    // ─── Submission ───
    #[error("Invalid transaction: {message}")]
    InvalidTransaction {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error(
        "Invalid nonce: transaction nonce {tx_nonce} must be greater than access key nonce {ak_nonce}"
    )]
    InvalidNonce { tx_nonce: u64, ak_nonce: u64 },

    // ─── Node ───
    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Request timeout: {0}")]
    RequestTimeout(String),
}

impl RpcError {
    /// Check if this error is retryable on the read path.
    ///
    /// Submission never consults this: a signed transaction is sent once.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Http(e) => e.is_timeout() || e.is_connect(),
            RpcError::Timeout(_) => true,
            RpcError::Network { retryable, .. } => *retryable,
            RpcError::InternalError(_) => true,
            RpcError::RequestTimeout(_) => true,
            RpcError::Rpc { code, .. } => *code == -32000 || *code == -32603,
            _ => false,
        }
    }

    /// Whether the request never got a structured answer from the node.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RpcError::Http(_) | RpcError::Network { .. } | RpcError::Timeout(_)
        )
    }

    /// Whether the node refused the transaction before queuing it.
    ///
    /// Only these answers prove a submitted transaction will never execute.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RpcError::InvalidTransaction { .. }
                | RpcError::InvalidNonce { .. }
                | RpcError::ParseError(_)
        )
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>, status_code: Option<u16>, retryable: bool) -> Self {
        RpcError::Network {
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Create an invalid transaction error.
    pub fn invalid_transaction(
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        RpcError::InvalidTransaction {
            message: message.into(),
            details,
        }
    }

    /// Create a function call error.
    pub fn function_call(
        contract_id: AccountId,
        method_name: impl Into<String>,
        message: impl Into<String>,
        logs: Vec<String>,
    ) -> Self {
        RpcError::FunctionCall {
            contract_id,
            method_name: method_name.into(),
            message: message.into(),
            logs,
        }
    }

    /// Returns true if this error indicates the account was not found.
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, RpcError::AccountNotFound(_))
    }

    /// The node's current access key nonce, if this is a stale-nonce rejection.
    pub fn stale_nonce(&self) -> Option<u64> {
        match self {
            RpcError::InvalidNonce { ak_nonce, .. } => Some(*ak_nonce),
            _ => None,
        }
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Main error type for nearlib operations.
#[derive(Debug, Error)]
pub enum Error {
    // ─── Configuration ───
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ─── Parsing ───
    #[error(transparent)]
    ParseAccountId(#[from] ParseAccountIdError),

    #[error(transparent)]
    ParseAmount(#[from] ParseAmountError),

    #[error(transparent)]
    ParseKey(#[from] ParseKeyError),

    #[error(transparent)]
    ParseHash(#[from] ParseHashError),

    // ─── Construction ───
    #[error("No signing key found for account {0}")]
    KeyNotFound(AccountId),

    #[error("Invalid transaction intent: {0}")]
    InvalidIntent(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    // ─── Submission ───
    #[error("Node unreachable: {0}")]
    RpcUnreachable(#[source] RpcError),

    #[error("Transaction rejected by node: {message}")]
    RejectedBySyntax {
        message: String,
        #[source]
        source: RpcError,
    },

    #[error("Submission of transaction {hash} unconfirmed: {source}; it may still execute")]
    SubmissionUnconfirmed {
        hash: CryptoHash,
        #[source]
        source: RpcError,
    },

    // ─── Outcome ───
    #[error("Transaction {hash} failed: {reason}")]
    ExecutionFailed {
        hash: CryptoHash,
        reason: String,
        logs: Vec<String>,
    },

    #[error("Transaction {hash} outcome unknown after {elapsed:?}; it may still complete")]
    AmbiguousTimeout { hash: CryptoHash, elapsed: Duration },

    // ─── Read path ───
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Borsh error: {0}")]
    Borsh(String),
}

impl Error {
    /// The transaction is known not to have taken effect, or failed during
    /// execution. Safe to treat as final.
    pub fn is_known_failure(&self) -> bool {
        matches!(
            self,
            Error::KeyNotFound(_)
                | Error::InvalidIntent(_)
                | Error::RejectedBySyntax { .. }
                | Error::ExecutionFailed { .. }
        )
    }

    /// The client stopped checking before learning the outcome.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            Error::AmbiguousTimeout { .. } | Error::SubmissionUnconfirmed { .. }
        )
    }

    /// Hash to poll when the outcome is still unknown.
    pub fn pending_hash(&self) -> Option<CryptoHash> {
        match self {
            Error::AmbiguousTimeout { hash, .. } | Error::SubmissionUnconfirmed { hash, .. } => {
                Some(*hash)
            }
            _ => None,
        }
    }

    /// Logs captured from a failed execution.
    pub fn logs(&self) -> &[String] {
        match self {
            Error::ExecutionFailed { logs, .. } => logs,
            Error::Rpc(RpcError::FunctionCall { logs, .. }) => logs,
            _ => &[],
        }
    }
}
