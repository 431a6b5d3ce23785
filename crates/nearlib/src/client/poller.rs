//! Waiting for submitted transactions to reach a terminal state.
//!
//! The node only offers an eventually consistent status query, so the poller
//! asks repeatedly with bounded exponential backoff until it sees `Completed`
//! or `Failed`, or until its time budget runs out.
//!
//! ```text
//! Submitted ──► Pending ──► Completed
//!     │           │  ▲  └──► Failed
//!     │           └──┘
//!     └───────────┴───────► TimedOut
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::rpc::NodeClient;
use crate::types::{TransactionHandle, TransactionOutcome, TransactionStatusView, TxStatus};

/// Backoff and budget for polling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before the second query.
    pub initial_interval: Duration,
    /// Upper bound on the delay between queries.
    pub max_interval: Duration,
    /// Growth factor applied to the delay after each query.
    pub multiplier: u32,
    /// Total time budget, including time spent in queries.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(2),
            multiplier: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

impl PollConfig {
    /// Same backoff, different budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn next_interval(&self, interval: Duration) -> Duration {
        interval
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_interval)
    }
}

/// Where a single poll currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    /// Handle received, nothing asked yet.
    Submitted,
    /// The node has answered with a non-terminal status, or not answered.
    Pending,
    Completed,
    Failed,
    /// The budget ran out first.
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollState::Completed | PollState::Failed | PollState::TimedOut
        )
    }
}

/// One poll in progress. Owned by a single `poll` call.
struct Poll {
    handle: TransactionHandle,
    state: PollState,
    attempts: u32,
    started: Instant,
    interval: Duration,
}

impl Poll {
    fn new(handle: TransactionHandle, config: &PollConfig) -> Self {
        Self {
            handle,
            state: PollState::Submitted,
            attempts: 0,
            started: Instant::now(),
            interval: config.initial_interval,
        }
    }

    fn transition(&mut self, to: PollState) {
        if self.state != to {
            debug!(
                hash = %self.handle,
                from = ?self.state,
                to = ?to,
                attempts = self.attempts,
                "poll state changed"
            );
            self.state = to;
        }
    }

    fn time_out(&mut self) -> TransactionOutcome {
        self.transition(PollState::TimedOut);
        TransactionOutcome::TimedOut {
            elapsed: self.started.elapsed(),
        }
    }

    /// Apply a status answer. Returns the outcome if it was terminal.
    fn observe(&mut self, view: TransactionStatusView) -> Option<TransactionOutcome> {
        match view.status {
            TxStatus::Pending => {
                self.transition(PollState::Pending);
                None
            }
            TxStatus::Completed => {
                self.transition(PollState::Completed);
                Some(TransactionOutcome::Completed {
                    value: view.value,
                    logs: view.logs,
                })
            }
            TxStatus::Failed => {
                self.transition(PollState::Failed);
                Some(TransactionOutcome::Failed {
                    reason: view
                        .failure
                        .unwrap_or_else(|| "execution failed without a reason".to_string()),
                    logs: view.logs,
                })
            }
        }
    }
}

/// Drives handles to a terminal [`TransactionOutcome`].
///
/// Polling never changes the transaction: dropping the future, or timing out,
/// only stops observation. A later poll of the same handle can still see the
/// final result, and polling a finished handle returns the same outcome again.
#[derive(Clone)]
pub struct ResultPoller {
    node: Arc<dyn NodeClient>,
    config: PollConfig,
}

impl ResultPoller {
    pub fn new(node: Arc<dyn NodeClient>, config: PollConfig) -> Self {
        Self { node, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll with the configured budget.
    pub async fn poll(&self, handle: &TransactionHandle) -> TransactionOutcome {
        self.poll_with_timeout(handle, self.config.timeout).await
    }

    /// Poll with an explicit budget. A zero budget times out without asking
    /// the node.
    pub async fn poll_with_timeout(
        &self,
        handle: &TransactionHandle,
        timeout: Duration,
    ) -> TransactionOutcome {
        let mut poll = Poll::new(*handle, &self.config);
        let hash = handle.hash();

        loop {
            let Some(remaining) = timeout.checked_sub(poll.started.elapsed()) else {
                return poll.time_out();
            };
            if remaining.is_zero() {
                return poll.time_out();
            }

            poll.attempts += 1;
            match tokio::time::timeout(remaining, self.node.transaction_status(&hash)).await {
                Ok(Ok(view)) => {
                    if let Some(outcome) = poll.observe(view) {
                        return outcome;
                    }
                }
                Ok(Err(e)) => {
                    warn!(%hash, attempt = poll.attempts, error = %e, "transient poll failure");
                    poll.transition(PollState::Pending);
                }
                Err(_) => return poll.time_out(),
            }

            let remaining = timeout.saturating_sub(poll.started.elapsed());
            tokio::time::sleep(poll.interval.min(remaining)).await;
            poll.interval = self.config.next_interval(poll.interval);
        }
    }
}

impl std::fmt::Debug for ResultPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultPoller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
