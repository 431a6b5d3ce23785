//! Turning intents into signed transactions.
//!
//! An [`Intent`] describes one action. [`TransactionBuilder::build`] validates
//! it, resolves the signing key, takes a nonce, then encodes, hashes and signs.
//! Key lookup happens before the nonce is taken, so a missing key neither
//! consumes a nonce nor touches the network.
//!
//! # Example
//!
//! ```rust,no_run
//! # use nearlib::*;
//! # async fn example(near: Near) -> Result<(), nearlib::Error> {
//! let intent = Intent::function_call(
//!     "counter.near".parse()?,
//!     "increment",
//!     &serde_json::json!({ "by": 2 }),
//! )
//! .with_gas(Gas::from_tgas(50));
//!
//! let outcome = near.send_transaction(intent, "alice.near").await?;
//! println!("{}", outcome.status());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::nonce::NonceTracker;
use super::signer::Signer;
use crate::error::Error;
use crate::types::{
    AccountId, Action, CreateAccountAction, DeployContractAction, FunctionCallAction, Gas,
    NearToken, PublicKey, SignedTransaction, Transaction, TransferAction,
};

/// What the caller wants done, before it is bound to a signer and nonce.
///
/// Problems found while building the intent (argument serialization, a gas
/// override on a non-call) are kept and reported by
/// [`TransactionBuilder::build`] as [`Error::InvalidIntent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intent {
    action: Result<Action, String>,
}

impl Intent {
    /// Create and fund `new_account_id`, owned by `public_key`.
    pub fn create_account(
        new_account_id: AccountId,
        public_key: PublicKey,
        amount: NearToken,
    ) -> Self {
        Action::CreateAccount(CreateAccountAction {
            new_account_id,
            public_key,
            amount,
        })
        .into()
    }

    /// Deploy contract code to the originator's own account.
    pub fn deploy_contract(code: impl Into<Vec<u8>>) -> Self {
        Action::DeployContract(DeployContractAction { code: code.into() }).into()
    }

    /// Call `method_name` on `contract_id` with JSON-serialized `args`.
    ///
    /// Uses [`Gas::DEFAULT`] and no deposit.
    pub fn function_call<A: Serialize + ?Sized>(
        contract_id: AccountId,
        method_name: impl Into<String>,
        args: &A,
    ) -> Self {
        match serde_json::to_vec(args) {
            Ok(args) => Self::function_call_raw(contract_id, method_name, args),
            Err(e) => Self {
                action: Err(format!("failed to serialize arguments: {e}")),
            },
        }
    }

    /// Call `method_name` on `contract_id` with pre-encoded argument bytes.
    pub fn function_call_raw(
        contract_id: AccountId,
        method_name: impl Into<String>,
        args: Vec<u8>,
    ) -> Self {
        Action::FunctionCall(FunctionCallAction {
            contract_id,
            method_name: method_name.into(),
            args,
            gas: Gas::DEFAULT,
            deposit: NearToken::ZERO,
        })
        .into()
    }

    /// Send `amount` to `receiver_id`.
    pub fn transfer(receiver_id: AccountId, amount: NearToken) -> Self {
        Action::Transfer(TransferAction {
            receiver_id,
            amount,
        })
        .into()
    }

    /// Override the gas attached to a function call.
    pub fn with_gas(self, gas: Gas) -> Self {
        self.map_call("gas", |call| call.gas = gas)
    }

    /// Attach a deposit to a function call.
    pub fn with_deposit(self, deposit: NearToken) -> Self {
        self.map_call("deposit", |call| call.deposit = deposit)
    }

    /// The action, or `None` if the intent is already known to be invalid.
    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref().ok()
    }

    fn map_call(self, what: &str, f: impl FnOnce(&mut FunctionCallAction)) -> Self {
        let action = self.action.and_then(|action| match action {
            Action::FunctionCall(mut call) => {
                f(&mut call);
                Ok(Action::FunctionCall(call))
            }
            other => Err(format!(
                "{what} only applies to function calls, not {}",
                other.kind()
            )),
        });
        Self { action }
    }

    /// Check intent-specific preconditions against the originating account.
    fn validate(&self, originator: &AccountId) -> Result<&Action, Error> {
        let action = self.action.as_ref().map_err(|e| Error::InvalidIntent(e.clone()))?;
        let problem = match action {
            Action::CreateAccount(create) if &create.new_account_id == originator => {
                Some(format!("account {originator} cannot create itself"))
            }
            Action::DeployContract(deploy) if deploy.code.is_empty() => {
                Some("contract code is empty".to_string())
            }
            Action::FunctionCall(call) if call.method_name.is_empty() => {
                Some("method name is empty".to_string())
            }
            Action::Transfer(transfer) if transfer.amount.is_zero() => {
                Some("transfer amount must be greater than zero".to_string())
            }
            Action::Transfer(transfer) if &transfer.receiver_id == originator => {
                Some(format!("account {originator} cannot transfer to itself"))
            }
            _ => None,
        };
        match problem {
            Some(message) => Err(Error::InvalidIntent(message)),
            None => Ok(action),
        }
    }
}

impl From<Action> for Intent {
    fn from(action: Action) -> Self {
        Self { action: Ok(action) }
    }
}

/// Builds signed transactions from intents.
///
/// Performs no network I/O of its own beyond the nonce tracker's first lookup
/// for an account.
#[derive(Clone)]
pub struct TransactionBuilder {
    signer: Arc<dyn Signer>,
    nonces: Arc<NonceTracker>,
}

impl TransactionBuilder {
    pub fn new(signer: Arc<dyn Signer>, nonces: Arc<NonceTracker>) -> Self {
        Self { signer, nonces }
    }

    /// Validate, bind to `originator`, and sign.
    pub async fn build(
        &self,
        intent: &Intent,
        originator: &AccountId,
    ) -> Result<SignedTransaction, Error> {
        let action = intent.validate(originator)?;
        let key = self.signer.key(originator)?;
        let nonce = self.nonces.next_nonce(originator).await?;

        let transaction = Transaction {
            signer_id: originator.clone(),
            public_key: *key.public_key(),
            nonce,
            action: action.clone(),
        };
        let hash = transaction.get_hash()?;
        let signature = key.sign(hash.as_bytes());

        debug!(
            signer_id = %originator,
            receiver_id = %transaction.receiver_id(),
            action = action.kind(),
            nonce,
            %hash,
            "built transaction"
        );
        Ok(SignedTransaction::from_parts(transaction, signature, hash))
    }
}

impl std::fmt::Debug for TransactionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionBuilder")
            .field("nonces", &self.nonces)
            .finish_non_exhaustive()
    }
}
