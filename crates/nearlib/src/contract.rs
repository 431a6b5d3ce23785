//! Contract facades with declared view and change methods.
//!
//! A [`Contract`] is loaded with the list of methods it exposes. View methods
//! are read-only queries; change methods go through the full transaction
//! pipeline, signed by the contract's default sender.
//!
//! # Example
//!
//! ```rust,no_run
//! use nearlib::*;
//! use serde_json::json;
//!
//! # async fn example(near: Near) -> Result<(), nearlib::Error> {
//! let contract = near.load_contract(
//!     "hello.near",
//!     ContractOptions::new("alice.near")?
//!         .view_methods(["hello", "getValue"])
//!         .change_methods(["setValue"]),
//! )?;
//!
//! let greeting: String = contract.view("hello", &json!({ "name": "trex" })).await?;
//! contract.call("setValue", &json!({ "value": "42" })).await?;
//! let value: String = contract.view("getValue", &json!({})).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::{Intent, Near};
use crate::error::Error;
use crate::types::{AccountId, ExecutionSuccess, Gas, NearToken};

/// Which methods a contract exposes, and who signs change calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractOptions {
    /// Default signer for change methods.
    pub sender: AccountId,
    pub view_methods: BTreeSet<String>,
    pub change_methods: BTreeSet<String>,
}

impl ContractOptions {
    pub fn new(sender: impl AsRef<str>) -> Result<Self, Error> {
        Ok(Self {
            sender: sender.as_ref().parse()?,
            view_methods: BTreeSet::new(),
            change_methods: BTreeSet::new(),
        })
    }

    pub fn view_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.view_methods.extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn change_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.change_methods.extend(methods.into_iter().map(Into::into));
        self
    }
}

/// Gas and deposit for a change call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Defaults to [`Gas::DEFAULT`].
    pub gas: Option<Gas>,
    pub deposit: NearToken,
    /// Poll budget; defaults to the client's configured timeout.
    pub timeout: Option<Duration>,
}

/// A deployed contract with a fixed set of callable methods.
#[derive(Clone, Debug)]
pub struct Contract {
    near: Near,
    contract_id: AccountId,
    options: ContractOptions,
}

impl Contract {
    pub(crate) fn new(near: Near, contract_id: AccountId, options: ContractOptions) -> Self {
        Self {
            near,
            contract_id,
            options,
        }
    }

    pub fn contract_id(&self) -> &AccountId {
        &self.contract_id
    }

    pub fn sender(&self) -> &AccountId {
        &self.options.sender
    }

    pub fn options(&self) -> &ContractOptions {
        &self.options
    }

    /// Run a declared view method and decode its JSON result.
    ///
    /// Log lines the method emits are reported as `[<contract>]: <line>`.
    pub async fn view<T: DeserializeOwned>(
        &self,
        method: &str,
        args: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        if !self.options.view_methods.contains(method) {
            return Err(self.undeclared("view", method));
        }
        self.near
            .call_view_function(&self.contract_id, method, args)
            .await
    }

    /// Run a declared change method as the default sender and wait for it.
    pub async fn call(
        &self,
        method: &str,
        args: &(impl Serialize + ?Sized),
    ) -> Result<ExecutionSuccess, Error> {
        self.call_with(method, args, CallOptions::default()).await
    }

    /// Like [`call`](Self::call) with explicit gas, deposit or poll budget.
    ///
    /// # Errors
    ///
    /// - [`Error::ExecutionFailed`] if the method failed; logs are attached
    /// - [`Error::AmbiguousTimeout`] if the budget ran out first
    pub async fn call_with(
        &self,
        method: &str,
        args: &(impl Serialize + ?Sized),
        options: CallOptions,
    ) -> Result<ExecutionSuccess, Error> {
        if !self.options.change_methods.contains(method) {
            return Err(self.undeclared("change", method));
        }
        let intent = Intent::function_call(self.contract_id.clone(), method, args)
            .with_gas(options.gas.unwrap_or_default())
            .with_deposit(options.deposit);
        self.near
            .execute(intent, &self.options.sender, options.timeout)
            .await
    }

    fn undeclared(&self, kind: &str, method: &str) -> Error {
        Error::InvalidIntent(format!(
            "'{method}' is not a declared {kind} method of {}",
            self.contract_id
        ))
    }
}
