//! Submission handles and terminal transaction outcomes.

use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::CryptoHash;
use crate::error::Error;

/// Identifies a submitted transaction; the only key needed to poll it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHandle(CryptoHash);

impl TransactionHandle {
    pub fn new(hash: CryptoHash) -> Self {
        Self(hash)
    }

    pub fn hash(&self) -> CryptoHash {
        self.0
    }
}

impl From<CryptoHash> for TransactionHandle {
    fn from(hash: CryptoHash) -> Self {
        Self(hash)
    }
}

impl Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Where polling stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Executed successfully.
    Completed {
        /// Raw return value, if the execution produced one.
        value: Option<Vec<u8>>,
        logs: Vec<String>,
    },
    /// Executed and failed. Logs emitted before the failure are kept.
    Failed { reason: String, logs: Vec<String> },
    /// The poll budget ran out before the node reported a terminal status.
    /// The transaction may still complete.
    TimedOut { elapsed: Duration },
}

impl TransactionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransactionOutcome::Completed { .. })
    }

    pub fn logs(&self) -> &[String] {
        match self {
            TransactionOutcome::Completed { logs, .. }
            | TransactionOutcome::Failed { logs, .. } => logs,
            TransactionOutcome::TimedOut { .. } => &[],
        }
    }

    /// Short status label: `Completed`, `Failed` or `TimedOut`.
    pub fn status(&self) -> &'static str {
        match self {
            TransactionOutcome::Completed { .. } => "Completed",
            TransactionOutcome::Failed { .. } => "Failed",
            TransactionOutcome::TimedOut { .. } => "TimedOut",
        }
    }

    /// Turn a non-success outcome into the matching error.
    ///
    /// `Failed` becomes [`Error::ExecutionFailed`], `TimedOut` becomes
    /// [`Error::AmbiguousTimeout`].
    pub fn into_result(self, handle: &TransactionHandle) -> Result<ExecutionSuccess, Error> {
        match self {
            TransactionOutcome::Completed { value, logs } => Ok(ExecutionSuccess {
                hash: handle.hash(),
                value,
                logs,
            }),
            TransactionOutcome::Failed { reason, logs } => Err(Error::ExecutionFailed {
                hash: handle.hash(),
                reason,
                logs,
            }),
            TransactionOutcome::TimedOut { elapsed } => Err(Error::AmbiguousTimeout {
                hash: handle.hash(),
                elapsed,
            }),
        }
    }
}

/// A completed transaction's payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionSuccess {
    pub hash: CryptoHash,
    pub value: Option<Vec<u8>>,
    pub logs: Vec<String>,
}

impl ExecutionSuccess {
    /// Decode the return value as JSON. An absent value decodes as `null`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.value {
            Some(bytes) => serde_json::from_slice(bytes),
            None => serde_json::from_value(serde_json::Value::Null),
        }
    }
}
