//! Connection configuration.

use std::time::Duration;

use super::poller::PollConfig;
use super::rpc::RetryConfig;
use crate::error::Error;

/// Default node endpoint.
pub const DEFAULT_NODE_URL: &str = "http://localhost:3030";

/// Default network identifier; also names the credentials subdirectory.
pub const DEFAULT_NETWORK_ID: &str = "default";

/// Everything needed to reach a node. Built once, then shared read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub node_url: String,
    pub network_id: String,
    /// Retries for read-path RPC calls. Submission is never retried.
    pub retry: RetryConfig,
    pub poll: PollConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            network_id: DEFAULT_NETWORK_ID.to_string(),
            retry: RetryConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Defaults overridden by `NEAR_NODE_URL`, `NEAR_NETWORK_ID` and
    /// `NEAR_POLL_TIMEOUT_MS`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `NEAR_POLL_TIMEOUT_MS` is not an integer.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(url) = lookup("NEAR_NODE_URL") {
            config.node_url = url;
        }
        if let Some(network_id) = lookup("NEAR_NETWORK_ID") {
            config.network_id = network_id;
        }
        if let Some(timeout) = lookup("NEAR_POLL_TIMEOUT_MS") {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "NEAR_POLL_TIMEOUT_MS must be a number of milliseconds, got '{timeout}'"
                ))
            })?;
            config.poll.timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }
}
