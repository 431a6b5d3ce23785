//! Nonce tracking for concurrent transaction handling.
//!
//! Prevents nonce collisions when building several transactions for the same
//! account in parallel, by caching the next nonce in memory and incrementing
//! it atomically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::rpc::NodeClient;
use crate::error::{Error, RpcError};
use crate::types::AccountId;

/// Issues strictly increasing nonces per account.
///
/// The first request for an account reads the on-chain nonce and issues
/// `chain_nonce + 1`; an account that does not exist yet starts from 0.
/// Later requests are served from memory.
pub struct NonceTracker {
    node: Arc<dyn NodeClient>,
    /// Next nonce to hand out, per account.
    nonces: Mutex<HashMap<AccountId, AtomicU64>>,
}

impl NonceTracker {
    pub fn new(node: Arc<dyn NodeClient>) -> Self {
        Self {
            node,
            nonces: Mutex::new(HashMap::new()),
        }
    }

    /// Get the next nonce for an account.
    ///
    /// Never returns the same value twice for one account, including under
    /// concurrent calls.
    pub async fn next_nonce(&self, account_id: &AccountId) -> Result<u64, Error> {
        // Fast path: already cached
        if let Some(nonce) = self.issue_cached(account_id) {
            return Ok(nonce);
        }

        // Slow path: fetch from the node
        let chain_nonce = self.fetch_chain_nonce(account_id).await?;
        let next_nonce = chain_nonce.saturating_add(1);

        let mut nonces = self.lock();
        // Check again in case another task beat us to it
        if let Some(atomic) = nonces.get(account_id) {
            return Ok(atomic.fetch_add(1, Ordering::SeqCst));
        }
        nonces.insert(account_id.clone(), AtomicU64::new(next_nonce + 1));
        debug!(%account_id, chain_nonce, next_nonce, "initialized nonce");
        Ok(next_nonce)
    }

    /// Drop the cached nonce so the next request re-reads the chain.
    pub fn invalidate(&self, account_id: &AccountId) {
        self.lock().remove(account_id);
    }

    /// Raise the cached nonce after the node reported `chain_nonce` as the
    /// account's current nonce. Never lowers it.
    pub fn resync(&self, account_id: &AccountId, chain_nonce: u64) {
        let next_nonce = chain_nonce.saturating_add(1);
        let mut nonces = self.lock();
        match nonces.get(account_id) {
            Some(atomic) => {
                let previous = atomic.fetch_max(next_nonce, Ordering::SeqCst);
                debug!(%account_id, previous, next_nonce, "resynced nonce");
            }
            None => {
                nonces.insert(account_id.clone(), AtomicU64::new(next_nonce));
            }
        }
    }

    /// The nonce the next request would receive, if cached.
    pub fn peek(&self, account_id: &AccountId) -> Option<u64> {
        self.lock()
            .get(account_id)
            .map(|atomic| atomic.load(Ordering::SeqCst))
    }

    fn issue_cached(&self, account_id: &AccountId) -> Option<u64> {
        self.lock()
            .get(account_id)
            .map(|atomic| atomic.fetch_add(1, Ordering::SeqCst))
    }

    async fn fetch_chain_nonce(&self, account_id: &AccountId) -> Result<u64, Error> {
        match self.node.view_account(account_id).await {
            Ok(view) => Ok(view.nonce),
            Err(e) if e.is_account_not_found() => Ok(0),
            Err(e) if e.is_transport() => Err(Error::RpcUnreachable(e)),
            Err(e) => Err(e.into()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AccountId, AtomicU64>> {
        self.nonces.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for NonceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceTracker")
            .field("accounts", &self.lock().len())
            .finish()
    }
}
