//! The main Near client.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use super::account::Account;
use super::builder::{Intent, TransactionBuilder};
use super::config::ConnectionConfig;
use super::keystore::{InMemoryKeyStore, KeyStore};
use super::nonce::NonceTracker;
use super::poller::{PollConfig, ResultPoller};
use super::rpc::{NodeClient, RetryConfig, RpcClient};
use super::signer::KeyStoreSigner;
use super::submitter::Submitter;
use crate::contract::{Contract, ContractOptions};
use crate::error::{Error, RpcError};
use crate::types::{
    AccountId, AccountView, ExecutionSuccess, NearToken, TransactionHandle, TransactionOutcome,
    ViewFunctionResult,
};

/// The main client for interacting with a node.
///
/// `Near` owns the transaction pipeline: key store, nonce tracker, builder,
/// submitter and poller. Cloning is cheap and clones share all of it, so
/// nonces stay unique across clones.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use nearlib::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), nearlib::Error> {
///     let key_store = Arc::new(InMemoryKeyStore::from_keys(&[(
///         "alice.near",
///         "ed25519:3D4YudUahN1nawWogh8pAKSj92sUNMdbZGjn7kERKzYoTy8tnFQuwoGUC51DowKqorvkr2pytJSnwuSbsNVfqygr",
///     )])?);
///     let near = Near::new(Near::create_default_config(), key_store);
///
///     let alice = near.account("alice.near")?;
///     println!("Balance: {}", alice.balance().await?);
///
///     alice.send_money("bob.near", NearToken::near(1)).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Near {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    node: Arc<dyn NodeClient>,
    key_store: Arc<dyn KeyStore>,
    nonces: Arc<NonceTracker>,
    builder: TransactionBuilder,
    submitter: Submitter,
    poller: ResultPoller,
}

impl Near {
    /// The default connection configuration.
    pub fn create_default_config() -> ConnectionConfig {
        ConnectionConfig::default()
    }

    /// Connect over JSON-RPC using `config`, signing with keys from `key_store`.
    pub fn new(config: ConnectionConfig, key_store: Arc<dyn KeyStore>) -> Self {
        let node = Arc::new(RpcClient::with_retry_config(
            config.node_url.clone(),
            config.retry.clone(),
        ));
        Self::from_parts(config, node, key_store)
    }

    /// Create a builder starting from the default configuration.
    pub fn builder() -> NearBuilder {
        NearBuilder::new(ConnectionConfig::default())
    }

    /// Create a client from environment variables.
    ///
    /// Reads `NEAR_NODE_URL`, `NEAR_NETWORK_ID` and `NEAR_POLL_TIMEOUT_MS`
    /// (see [`ConnectionConfig::from_env`]). With the `file-keystore` feature,
    /// keys are read from `~/.near-credentials/<network_id>`; otherwise the
    /// key store starts empty.
    pub fn from_env() -> Result<Near, Error> {
        let config = ConnectionConfig::from_env()?;

        #[cfg(feature = "file-keystore")]
        let key_store: Arc<dyn KeyStore> = Arc::new(
            super::keystore::FileKeyStore::default_location(&config.network_id)?,
        );
        #[cfg(not(feature = "file-keystore"))]
        let key_store: Arc<dyn KeyStore> = Arc::new(InMemoryKeyStore::new());

        Ok(NearBuilder::new(config).key_store(key_store).build())
    }

    fn from_parts(
        config: ConnectionConfig,
        node: Arc<dyn NodeClient>,
        key_store: Arc<dyn KeyStore>,
    ) -> Self {
        let nonces = Arc::new(NonceTracker::new(node.clone()));
        let signer = Arc::new(KeyStoreSigner::new(key_store.clone()));
        let builder = TransactionBuilder::new(signer, nonces.clone());
        let submitter = Submitter::new(node.clone(), nonces.clone());
        let poller = ResultPoller::new(node.clone(), config.poll.clone());

        Self {
            inner: Arc::new(Inner {
                config,
                node,
                key_store,
                nonces,
                builder,
                submitter,
                poller,
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    pub fn node(&self) -> &Arc<dyn NodeClient> {
        &self.inner.node
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.inner.key_store
    }

    pub fn nonces(&self) -> &NonceTracker {
        &self.inner.nonces
    }

    // ========================================================================
    // Read operations
    // ========================================================================

    /// Current on-chain state of an account.
    pub async fn view_account(&self, account_id: impl AsRef<str>) -> Result<AccountView, Error> {
        let account_id: AccountId = account_id.as_ref().parse()?;
        Ok(self.inner.node.view_account(&account_id).await?)
    }

    /// Handle for acting as `account_id`.
    pub fn account(&self, account_id: impl AsRef<str>) -> Result<Account, Error> {
        Ok(Account::new(self.clone(), account_id.as_ref().parse()?))
    }

    /// Call a view method and decode its JSON result.
    ///
    /// Never creates a transaction: no nonce, signature or polling.
    pub async fn call_view_function<T: DeserializeOwned>(
        &self,
        contract_id: impl AsRef<str>,
        method_name: &str,
        args: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        let result = self
            .call_view_function_raw(contract_id, method_name, serde_json::to_vec(args)?)
            .await?;
        Ok(result.json()?)
    }

    /// Call a view method with pre-encoded arguments and return the raw result.
    pub async fn call_view_function_raw(
        &self,
        contract_id: impl AsRef<str>,
        method_name: &str,
        args: Vec<u8>,
    ) -> Result<ViewFunctionResult, Error> {
        let contract_id: AccountId = contract_id.as_ref().parse()?;
        match self
            .inner
            .node
            .call_view_function(&contract_id, method_name, &args)
            .await
        {
            Ok(result) => {
                emit_contract_logs(&contract_id, &result.logs);
                Ok(result)
            }
            Err(e) => {
                if let RpcError::FunctionCall { logs, .. } = &e {
                    emit_contract_logs(&contract_id, logs);
                }
                Err(e.into())
            }
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Deploy `code` to `account_id`, signed by that account.
    pub async fn deploy_contract(
        &self,
        account_id: impl AsRef<str>,
        code: impl Into<Vec<u8>>,
    ) -> Result<TransactionHandle, Error> {
        self.submit_transaction(Intent::deploy_contract(code), account_id)
            .await
    }

    /// Submit a function call from `sender` and return without waiting.
    pub async fn schedule_function_call(
        &self,
        amount: NearToken,
        sender: impl AsRef<str>,
        contract_id: impl AsRef<str>,
        method_name: &str,
        args: &(impl Serialize + ?Sized),
    ) -> Result<TransactionHandle, Error> {
        let contract_id: AccountId = contract_id.as_ref().parse()?;
        let intent = Intent::function_call(contract_id, method_name, args).with_deposit(amount);
        self.submit_transaction(intent, sender).await
    }

    /// Poll a submitted transaction with the configured budget.
    pub async fn wait_for_transaction_result(
        &self,
        handle: &TransactionHandle,
    ) -> TransactionOutcome {
        self.inner.poller.poll(handle).await
    }

    /// Poll a submitted transaction with an explicit budget.
    pub async fn wait_for_transaction_result_with_timeout(
        &self,
        handle: &TransactionHandle,
        timeout: Duration,
    ) -> TransactionOutcome {
        self.inner.poller.poll_with_timeout(handle, timeout).await
    }

    /// Build, sign and submit; return the handle without waiting.
    pub async fn submit_transaction(
        &self,
        intent: Intent,
        originator: impl AsRef<str>,
    ) -> Result<TransactionHandle, Error> {
        let originator: AccountId = originator.as_ref().parse()?;
        let signed = self.inner.builder.build(&intent, &originator).await?;
        self.inner.submitter.submit(&signed).await
    }

    /// Build, sign, submit and wait for the terminal outcome.
    ///
    /// A `Failed` or `TimedOut` outcome is returned as-is, not as an error.
    pub async fn send_transaction(
        &self,
        intent: Intent,
        originator: impl AsRef<str>,
    ) -> Result<TransactionOutcome, Error> {
        let handle = self.submit_transaction(intent, originator).await?;
        Ok(self.wait_for_transaction_result(&handle).await)
    }

    /// Like [`send_transaction`](Self::send_transaction), but failures become
    /// errors and contract logs are emitted under the receiving account.
    ///
    /// `Failed` becomes [`Error::ExecutionFailed`]; running out of time
    /// becomes [`Error::AmbiguousTimeout`].
    pub async fn execute(
        &self,
        intent: Intent,
        originator: impl AsRef<str>,
        timeout: Option<Duration>,
    ) -> Result<ExecutionSuccess, Error> {
        let originator: AccountId = originator.as_ref().parse()?;
        let signed = self.inner.builder.build(&intent, &originator).await?;
        let receiver_id = signed.transaction().receiver_id().clone();
        let handle = self.inner.submitter.submit(&signed).await?;

        let timeout = timeout.unwrap_or(self.inner.config.poll.timeout);
        let outcome = self
            .wait_for_transaction_result_with_timeout(&handle, timeout)
            .await;
        emit_contract_logs(&receiver_id, outcome.logs());
        outcome.into_result(&handle)
    }

    /// Load a contract facade exposing the declared methods.
    pub fn load_contract(
        &self,
        contract_id: impl AsRef<str>,
        options: ContractOptions,
    ) -> Result<Contract, Error> {
        Ok(Contract::new(
            self.clone(),
            contract_id.as_ref().parse()?,
            options,
        ))
    }
}

impl std::fmt::Debug for Near {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Near")
            .field("node_url", &self.inner.config.node_url)
            .field("network_id", &self.inner.config.network_id)
            .finish()
    }
}

/// Emit contract log lines as `[<contract>]: <line>`.
pub(crate) fn emit_contract_logs(contract_id: &AccountId, logs: &[String]) {
    for line in logs {
        info!(contract = %contract_id, "[{}]: {}", contract_id, line);
    }
}

/// Builder for creating a [`Near`] client.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use nearlib::*;
///
/// let near = Near::builder()
///     .node_url("http://127.0.0.1:3030")
///     .key_store(Arc::new(InMemoryKeyStore::new()))
///     .poll_config(PollConfig::default().with_timeout(Duration::from_secs(10)))
///     .build();
/// ```
pub struct NearBuilder {
    config: ConnectionConfig,
    key_store: Option<Arc<dyn KeyStore>>,
    node: Option<Arc<dyn NodeClient>>,
}

impl NearBuilder {
    fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            key_store: None,
            node: None,
        }
    }

    /// Replace the whole connection configuration.
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn node_url(mut self, url: impl Into<String>) -> Self {
        self.config.node_url = url.into();
        self
    }

    pub fn network_id(mut self, network_id: impl Into<String>) -> Self {
        self.config.network_id = network_id.into();
        self
    }

    /// Set the key store. Defaults to an empty [`InMemoryKeyStore`].
    pub fn key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    /// Talk to `node` instead of a JSON-RPC endpoint at `node_url`.
    pub fn node(mut self, node: Arc<dyn NodeClient>) -> Self {
        self.node = Some(node);
        self
    }

    /// Set the retry configuration for read-path RPC calls.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.config.retry = config;
        self
    }

    pub fn poll_config(mut self, config: PollConfig) -> Self {
        self.config.poll = config;
        self
    }

    /// Build the client.
    pub fn build(self) -> Near {
        let key_store = self
            .key_store
            .unwrap_or_else(|| Arc::new(InMemoryKeyStore::new()));
        let node = self.node.unwrap_or_else(|| {
            Arc::new(RpcClient::with_retry_config(
                self.config.node_url.clone(),
                self.config.retry.clone(),
            ))
        });
        Near::from_parts(self.config, node, key_store)
    }
}

impl From<NearBuilder> for Near {
    fn from(builder: NearBuilder) -> Self {
        builder.build()
    }
}
