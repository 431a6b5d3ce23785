//! Single-shot transaction submission.

use std::sync::Arc;

use tracing::{debug, warn};

use super::nonce::NonceTracker;
use super::rpc::NodeClient;
use crate::error::Error;
use crate::types::{SignedTransaction, TransactionHandle};

/// Hands signed transactions to the node.
///
/// Each call sends exactly once. A transport failure is
/// [`Error::RpcUnreachable`]. A rejection before queuing (bad signature,
/// stale nonce, malformed payload) is [`Error::RejectedBySyntax`]. Any other
/// node answer, such as a node-side timeout, an internal error or an
/// unreadable acknowledgement, is [`Error::SubmissionUnconfirmed`]: the
/// transaction may still execute and should be polled by its hash.
///
/// When the rejection is a stale nonce, the nonce tracker is raised to the
/// node's value so the next transaction from that account is accepted. The
/// rejected transaction itself is never resent.
#[derive(Clone)]
pub struct Submitter {
    node: Arc<dyn NodeClient>,
    nonces: Arc<NonceTracker>,
}

impl Submitter {
    pub fn new(node: Arc<dyn NodeClient>, nonces: Arc<NonceTracker>) -> Self {
        Self { node, nonces }
    }

    /// Send once and return the handle the transaction can be polled by.
    pub async fn submit(&self, signed_tx: &SignedTransaction) -> Result<TransactionHandle, Error> {
        let signer_id = &signed_tx.transaction().signer_id;
        let hash = signed_tx.hash();

        match self.node.submit_transaction(signed_tx).await {
            Ok(acknowledged) => {
                if acknowledged != hash {
                    warn!(%hash, %acknowledged, "node acknowledged under a different hash");
                }
                debug!(
                    %signer_id,
                    %hash,
                    nonce = signed_tx.transaction().nonce,
                    "submitted transaction"
                );
                Ok(TransactionHandle::new(hash))
            }
            Err(e) if e.is_transport() => Err(Error::RpcUnreachable(e)),
            Err(e) if !e.is_rejection() => {
                warn!(%signer_id, %hash, error = %e, "submission unconfirmed");
                Err(Error::SubmissionUnconfirmed { hash, source: e })
            }
            Err(e) => {
                if let Some(ak_nonce) = e.stale_nonce() {
                    warn!(
                        %signer_id,
                        tx_nonce = signed_tx.transaction().nonce,
                        ak_nonce,
                        "stale nonce, resyncing"
                    );
                    self.nonces.resync(signer_id, ak_nonce);
                }
                Err(Error::RejectedBySyntax {
                    message: e.to_string(),
                    source: e,
                })
            }
        }
    }
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter").finish_non_exhaustive()
    }
}
