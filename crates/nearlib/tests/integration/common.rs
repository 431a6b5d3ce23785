//! In-process ledger standing in for a node, plus test helpers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use nearlib::*;
use serde_json::{Value, json};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub const ALICE: &str = "alice.near";
pub const ALICE_SECRET: &str = "ed25519:3D4YudUahN1nawWogh8pAKSj92sUNMdbZGjn7kERKzYoTy8tnFQuwoGUC51DowKqorvkr2pytJSnwuSbsNVfqygr";
pub const ALICE_BALANCE: u128 = 100;

/// Stand-in contract code; the ledger runs the same scripted methods for any
/// deployed code.
pub const HELLO_WASM: &[u8] = b"\0asm\x01\0\0\0hello";

// ============================================================================
// Ledger
// ============================================================================

struct AccountEntry {
    amount: u128,
    nonce: u64,
    code: Option<Vec<u8>>,
    keys: Vec<PublicKey>,
    storage: BTreeMap<String, String>,
}

impl AccountEntry {
    fn new(amount: u128, key: Option<PublicKey>) -> Self {
        Self {
            amount,
            nonce: 0,
            code: None,
            keys: key.into_iter().collect(),
            storage: BTreeMap::new(),
        }
    }
}

struct TxEntry {
    pending_left: u32,
    view: TransactionStatusView,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, AccountEntry>,
    txs: HashMap<CryptoHash, TxEntry>,
}

type MethodResult = Result<(Option<Vec<u8>>, Vec<String>), (String, Vec<String>)>;

impl LedgerState {
    fn debit(&mut self, account_id: &AccountId, amount: NearToken) -> Result<(), String> {
        let entry = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| format!("AccountDoesNotExist {{ account_id: {account_id} }}"))?;
        entry.amount = entry
            .amount
            .checked_sub(amount.as_yoctonear())
            .ok_or_else(|| format!("NotEnoughBalance {{ account_id: {account_id} }}"))?;
        Ok(())
    }

    fn credit(&mut self, account_id: &AccountId, amount: NearToken) {
        if let Some(entry) = self.accounts.get_mut(account_id) {
            entry.amount += amount.as_yoctonear();
        }
    }

    fn execute(&mut self, tx: &Transaction) -> TransactionStatusView {
        let result: MethodResult = match &tx.action {
            Action::CreateAccount(create) => {
                if self.accounts.contains_key(&create.new_account_id) {
                    Err((
                        format!(
                            "AccountAlreadyExists {{ account_id: {} }}",
                            create.new_account_id
                        ),
                        vec![],
                    ))
                } else {
                    self.debit(&tx.signer_id, create.amount)
                        .map(|()| {
                            self.accounts.insert(
                                create.new_account_id.clone(),
                                AccountEntry::new(
                                    create.amount.as_yoctonear(),
                                    Some(create.public_key),
                                ),
                            );
                            (None, vec![])
                        })
                        .map_err(|e| (e, vec![]))
                }
            }
            Action::DeployContract(deploy) => match self.accounts.get_mut(&tx.signer_id) {
                Some(entry) => {
                    entry.code = Some(deploy.code.clone());
                    Ok((None, vec![]))
                }
                None => Err(("signer vanished".to_string(), vec![])),
            },
            Action::FunctionCall(call) => self.function_call(&tx.signer_id, call),
            Action::Transfer(transfer) => {
                if !self.accounts.contains_key(&transfer.receiver_id) {
                    Err((
                        format!(
                            "AccountDoesNotExist {{ account_id: {} }}",
                            transfer.receiver_id
                        ),
                        vec![],
                    ))
                } else {
                    self.debit(&tx.signer_id, transfer.amount)
                        .map(|()| {
                            self.credit(&transfer.receiver_id, transfer.amount);
                            (None, vec![])
                        })
                        .map_err(|e| (e, vec![]))
                }
            }
        };

        match result {
            Ok((value, logs)) => TransactionStatusView {
                status: TxStatus::Completed,
                value,
                failure: None,
                logs,
            },
            Err((failure, logs)) => TransactionStatusView {
                status: TxStatus::Failed,
                value: None,
                failure: Some(failure),
                logs,
            },
        }
    }

    fn function_call(&mut self, signer_id: &AccountId, call: &FunctionCallAction) -> MethodResult {
        let has_code = match self.accounts.get(&call.contract_id) {
            Some(entry) => entry.code.is_some(),
            None => {
                return Err((
                    format!("AccountDoesNotExist {{ account_id: {} }}", call.contract_id),
                    vec![],
                ));
            }
        };
        if !has_code {
            return Err(("CodeDoesNotExist".to_string(), vec![]));
        }
        self.debit(signer_id, call.deposit).map_err(|e| (e, vec![]))?;

        let contract = self
            .accounts
            .get_mut(&call.contract_id)
            .ok_or_else(|| ("contract vanished".to_string(), vec![]))?;
        let result = run_method(&mut contract.storage, &call.method_name, &call.args, false);
        match &result {
            Ok(_) => self.credit(&call.contract_id, call.deposit),
            Err(_) => self.credit(signer_id, call.deposit),
        }
        result
    }
}

/// The scripted `hello` contract.
fn run_method(
    storage: &mut BTreeMap<String, String>,
    method: &str,
    args: &[u8],
    read_only: bool,
) -> MethodResult {
    let args: Value = if args.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(args).map_err(|e| (format!("bad args: {e}"), vec![]))?
    };
    let encode = |value: Value| Some(value.to_string().into_bytes());
    let arg = |name: &str| args[name].as_str().unwrap_or_default().to_string();

    match method {
        "hello" => Ok((encode(json!(format!("hello {}", arg("name")))), vec![])),
        "getValue" => Ok((
            encode(json!(storage.get("value").cloned().unwrap_or_default())),
            vec![],
        )),
        "getAllKeys" => Ok((
            encode(json!(storage.keys().collect::<Vec<_>>())),
            vec![],
        )),
        "returnHiWithLogs" => Ok((
            encode(json!("Hi")),
            vec!["LOG: loooog1".to_string(), "LOG: loooog2".to_string()],
        )),
        _ if read_only => Err((
            format!("ProhibitedInView {{ method_name: {method} }}"),
            vec![],
        )),
        "setValue" => {
            let value = arg("value");
            storage.insert("value".to_string(), value.clone());
            Ok((encode(json!(value)), vec![]))
        }
        "generateLogs" => Ok((None, vec!["LOG: log1".to_string(), "LOG: log2".to_string()])),
        "triggerAssert" => Err((
            "Smart contract panicked: expected to fail".to_string(),
            vec![
                "LOG: log before assert".to_string(),
                r#"ABORT: "expected to fail" filename: "main.ts" line: 35 col: 2"#.to_string(),
                r#"Runtime error: wasm async call execution failed with error: Wasmer(CallError(Runtime(User { msg: "Error: AssertFailed" })))"#.to_string(),
            ],
        )),
        "testSetRemove" => {
            storage.insert("test".to_string(), arg("value"));
            storage.remove("test");
            Ok((None, vec![]))
        }
        _ => Err((format!("MethodNotFound {{ method_name: {method} }}"), vec![])),
    }
}

/// A node that executes transactions on submission and reports them pending
/// for a configurable number of status queries.
pub struct FakeLedger {
    state: Mutex<LedgerState>,
    pending_rounds: AtomicU32,
    hold: AtomicBool,
    held: Mutex<HashSet<CryptoHash>>,
    drop_acks: AtomicBool,
    submissions: AtomicUsize,
    status_queries: AtomicUsize,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LedgerState::default()),
            pending_rounds: AtomicU32::new(2),
            hold: AtomicBool::new(false),
            held: Mutex::new(HashSet::new()),
            drop_acks: AtomicBool::new(false),
            submissions: AtomicUsize::new(0),
            status_queries: AtomicUsize::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn add_account(&self, account_id: &str, amount: NearToken, key: Option<PublicKey>) {
        self.lock().accounts.insert(
            account_id.parse().unwrap(),
            AccountEntry::new(amount.as_yoctonear(), key),
        );
    }

    /// Move an account's nonce as if another client had used it.
    pub fn set_nonce(&self, account_id: &str, nonce: u64) {
        let account_id: AccountId = account_id.parse().unwrap();
        self.lock().accounts.get_mut(&account_id).unwrap().nonce = nonce;
    }

    pub fn set_pending_rounds(&self, rounds: u32) {
        self.pending_rounds.store(rounds, Ordering::SeqCst);
    }

    /// While held, every known transaction reports `Pending`.
    pub fn hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    /// Report one transaction as `Pending` until released.
    pub fn hold_transaction(&self, hash: CryptoHash, hold: bool) {
        let mut held = self.held.lock().unwrap();
        if hold {
            held.insert(hash);
        } else {
            held.remove(&hash);
        }
    }

    /// While set, accepted transactions are queued but the node answers with
    /// `TIMEOUT_ERROR` instead of the hash.
    pub fn drop_acks(&self, enabled: bool) {
        self.drop_acks.store(enabled, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    fn submit(&self, signed_tx: &SignedTransaction) -> Result<CryptoHash, RpcError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if !signed_tx.verify() {
            return Err(RpcError::invalid_transaction("InvalidSignature", None));
        }

        let tx = signed_tx.transaction();
        let mut state = self.lock();
        {
            let signer = state.accounts.get_mut(&tx.signer_id).ok_or_else(|| {
                RpcError::invalid_transaction(
                    format!("SignerDoesNotExist {{ signer_id: {} }}", tx.signer_id),
                    None,
                )
            })?;
            if !signer.keys.contains(&tx.public_key) {
                return Err(RpcError::invalid_transaction("AccessKeyNotFound", None));
            }
            if tx.nonce <= signer.nonce {
                return Err(RpcError::InvalidNonce {
                    tx_nonce: tx.nonce,
                    ak_nonce: signer.nonce,
                });
            }
            // Consumed whatever the execution outcome.
            signer.nonce = tx.nonce;
        }

        let view = state.execute(tx);
        state.txs.insert(
            signed_tx.hash(),
            TxEntry {
                pending_left: self.pending_rounds.load(Ordering::SeqCst),
                view,
            },
        );
        if self.drop_acks.load(Ordering::SeqCst) {
            return Err(RpcError::RequestTimeout("Timeout".to_string()));
        }
        Ok(signed_tx.hash())
    }

    fn status(&self, hash: &CryptoHash) -> Result<TransactionStatusView, RpcError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.load(Ordering::SeqCst) || self.held.lock().unwrap().contains(hash);
        let mut state = self.lock();
        let entry = state
            .txs
            .get_mut(hash)
            .ok_or_else(|| RpcError::UnknownTransaction(hash.to_string()))?;
        if hold {
            return Ok(TransactionStatusView::pending());
        }
        if entry.pending_left > 0 {
            entry.pending_left -= 1;
            return Ok(TransactionStatusView::pending());
        }
        Ok(entry.view.clone())
    }

    fn view(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: &[u8],
    ) -> Result<ViewFunctionResult, RpcError> {
        let mut state = self.lock();
        let entry = state
            .accounts
            .get_mut(contract_id)
            .ok_or_else(|| RpcError::AccountNotFound(contract_id.clone()))?;
        let function_error = |message: String, logs: Vec<String>| RpcError::FunctionCall {
            contract_id: contract_id.clone(),
            method_name: method_name.to_string(),
            message,
            logs,
        };
        if entry.code.is_none() {
            return Err(function_error("CodeDoesNotExist".to_string(), vec![]));
        }
        match run_method(&mut entry.storage, method_name, args, true) {
            Ok((value, logs)) => Ok(ViewFunctionResult {
                result: value.unwrap_or_default(),
                logs,
            }),
            Err((message, logs)) => Err(function_error(message, logs)),
        }
    }
}

impl NodeClient for FakeLedger {
    fn view_account<'a>(
        &'a self,
        account_id: &'a AccountId,
    ) -> BoxFuture<'a, Result<AccountView, RpcError>> {
        let result = match self.lock().accounts.get(account_id) {
            Some(entry) => Ok(AccountView {
                account_id: account_id.clone(),
                nonce: entry.nonce,
                amount: NearToken::yocto(entry.amount),
                code_hash: entry
                    .code
                    .as_deref()
                    .map(CryptoHash::hash)
                    .unwrap_or(CryptoHash::ZERO),
                stake: NearToken::ZERO,
            }),
            None => Err(RpcError::AccountNotFound(account_id.clone())),
        };
        Box::pin(async move { result })
    }

    fn submit_transaction<'a>(
        &'a self,
        signed_tx: &'a SignedTransaction,
    ) -> BoxFuture<'a, Result<CryptoHash, RpcError>> {
        let result = self.submit(signed_tx);
        Box::pin(async move { result })
    }

    fn transaction_status<'a>(
        &'a self,
        hash: &'a CryptoHash,
    ) -> BoxFuture<'a, Result<TransactionStatusView, RpcError>> {
        let result = self.status(hash);
        Box::pin(async move { result })
    }

    fn call_view_function<'a>(
        &'a self,
        contract_id: &'a AccountId,
        method_name: &'a str,
        args: &'a [u8],
    ) -> BoxFuture<'a, Result<ViewFunctionResult, RpcError>> {
        let result = self.view(contract_id, method_name, args);
        Box::pin(async move { result })
    }
}

// ============================================================================
// Environment
// ============================================================================

pub struct TestEnv {
    pub ledger: Arc<FakeLedger>,
    pub key_store: Arc<InMemoryKeyStore>,
    pub near: Near,
}

impl TestEnv {
    pub fn alice(&self) -> Account {
        self.near.account(ALICE).unwrap()
    }

    /// Create `contract_id` funded by alice, store its key, deploy the hello
    /// contract to it.
    pub async fn deploy_hello(&self, contract_id: &str) {
        let (handle, _) = self
            .alice()
            .create_account_with_random_key(contract_id, NearToken::yocto(10))
            .await
            .unwrap();
        assert!(self.near.wait_for_transaction_result(&handle).await.is_completed());

        let handle = self
            .near
            .deploy_contract(contract_id, HELLO_WASM)
            .await
            .unwrap();
        assert!(self.near.wait_for_transaction_result(&handle).await.is_completed());
    }
}

pub fn fast_polling() -> PollConfig {
    PollConfig {
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
        multiplier: 2,
        timeout: Duration::from_secs(5),
    }
}

/// A ledger with alice funded and her key in the key store.
pub fn setup() -> TestEnv {
    init_tracing();

    let ledger = FakeLedger::new();
    let key_store = Arc::new(InMemoryKeyStore::from_keys(&[(ALICE, ALICE_SECRET)]).unwrap());
    let alice_key: KeyPair = ALICE_SECRET.parse().unwrap();
    ledger.add_account(
        ALICE,
        NearToken::yocto(ALICE_BALANCE),
        Some(alice_key.public_key),
    );

    let near = Near::builder()
        .network_id("localnet")
        .key_store(key_store.clone())
        .node(ledger.clone())
        .poll_config(fast_polling())
        .build();

    TestEnv {
        ledger,
        key_store,
        near,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Log capture
// ============================================================================

/// Collects the messages of `info` events, i.e. contract log lines.
struct CaptureLayer {
    lines: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != tracing::Level::INFO {
            return;
        }
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.lines.lock().unwrap().push(message);
        }
    }
}

/// Capture contract log lines on this thread until the guard drops.
pub fn capture_contract_logs() -> (Arc<Mutex<Vec<String>>>, tracing::subscriber::DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        lines: lines.clone(),
    });
    (lines, tracing::subscriber::set_default(subscriber))
}
