//! A Rust client for NEAR-style nodes.
//!
//! **nearlib** creates accounts, deploys and calls contracts, and drives
//! signed transactions to a known outcome over a node's JSON-RPC interface.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nearlib::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nearlib::Error> {
//!     let key_store = Arc::new(InMemoryKeyStore::from_keys(&[(
//!         "alice.near",
//!         "ed25519:3D4YudUahN1nawWogh8pAKSj92sUNMdbZGjn7kERKzYoTy8tnFQuwoGUC51DowKqorvkr2pytJSnwuSbsNVfqygr",
//!     )])?);
//!     let near = Near::new(Near::create_default_config(), key_store);
//!
//!     let state = near.view_account("alice.near").await?;
//!     println!("alice has {} at nonce {}", state.amount, state.nonce);
//!
//!     let handle = near
//!         .schedule_function_call(
//!             NearToken::ZERO,
//!             "alice.near",
//!             "hello.near",
//!             "setValue",
//!             &serde_json::json!({ "value": "42" }),
//!         )
//!         .await?;
//!     match near.wait_for_transaction_result(&handle).await {
//!         TransactionOutcome::Completed { logs, .. } => println!("done: {logs:?}"),
//!         TransactionOutcome::Failed { reason, .. } => println!("failed: {reason}"),
//!         TransactionOutcome::TimedOut { .. } => println!("still unknown, poll {handle} later"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # The Transaction Pipeline
//!
//! Every change goes through the same steps:
//!
//! 1. [`TransactionBuilder`] validates the [`Intent`], resolves the signing key
//!    through the [`Signer`], takes a nonce from the [`NonceTracker`], then
//!    Borsh-encodes, SHA-256 hashes and signs.
//! 2. [`Submitter`] sends it once and returns a [`TransactionHandle`].
//! 3. [`ResultPoller`] polls the handle with bounded backoff until it
//!    reaches a [`TransactionOutcome`].
//!
//! View calls skip all three.
//!
//! # Core Types
//!
//! - [`AccountId`] - Validated account identifier
//! - [`NearToken`] - Token amount with yoctoNEAR precision
//! - [`Gas`] - Gas units for function calls
//! - [`PublicKey`], [`SecretKey`], [`KeyPair`] - Ed25519 keys
//! - [`CryptoHash`] - 32-byte SHA-256 hash
//!
//! ```
//! use nearlib::{AccountId, NearToken};
//!
//! let amount: NearToken = "5 NEAR".parse().unwrap();
//! let account: AccountId = "alice.near".parse().unwrap();
//! assert_eq!(amount, NearToken::near(5));
//! assert_eq!(account.parent().unwrap().as_str(), "near");
//! ```

pub mod client;
pub mod contract;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{Error, RpcError};
pub use types::*;

pub use contract::{CallOptions, Contract, ContractOptions};

pub use client::{
    Account, ConnectionConfig, InMemoryKeyStore, Intent, KeyStore, KeyStoreSigner, Near,
    NearBuilder, NodeClient, NonceTracker, PollConfig, PollState, ResultPoller, RetryConfig,
    RpcClient, Signer, SigningKey, Submitter, TransactionBuilder,
};

#[cfg(feature = "file-keystore")]
pub use client::FileKeyStore;
