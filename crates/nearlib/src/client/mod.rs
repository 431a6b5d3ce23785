//! Client module: the transaction pipeline and the facades over it.
//!
//! Leaves first:
//!
//! - [`KeyStore`] - Where key pairs live ([`InMemoryKeyStore`], [`FileKeyStore`])
//! - [`Signer`] - Resolves an account's active key ([`KeyStoreSigner`])
//! - [`NonceTracker`] - Issues strictly increasing nonces per account
//! - [`TransactionBuilder`] - Validates an [`Intent`], then encodes, hashes and signs it
//! - [`Submitter`] - Sends a signed transaction exactly once
//! - [`ResultPoller`] - Polls a handle until a terminal outcome or timeout
//! - [`NodeClient`] - The node operations all of the above consume ([`RpcClient`])
//!
//! [`Near`], [`Account`] and [`Contract`](crate::Contract) wire these together.
//!
//! # Failure stages
//!
//! | Stage | Error | Did it happen? |
//! |-------|-------|----------------|
//! | Build | `KeyNotFound`, `InvalidIntent` | No |
//! | Submit | `RpcUnreachable`, `RejectedBySyntax` | No |
//! | Submit | `SubmissionUnconfirmed` | Unknown |
//! | Execute | `ExecutionFailed` | No, logs attached |
//! | Poll | `AmbiguousTimeout` | Unknown |

mod account;
mod builder;
mod config;
mod keystore;
mod near;
mod nonce;
mod poller;
mod rpc;
mod signer;
mod submitter;

pub use account::Account;
pub use builder::{Intent, TransactionBuilder};
pub use config::{ConnectionConfig, DEFAULT_NETWORK_ID, DEFAULT_NODE_URL};
#[cfg(feature = "file-keystore")]
pub use keystore::FileKeyStore;
pub use keystore::{InMemoryKeyStore, KeyStore};
pub use near::{Near, NearBuilder};
pub use nonce::NonceTracker;
pub use poller::{PollConfig, PollState, ResultPoller};
pub use rpc::{NodeClient, RetryConfig, RpcClient};
pub use signer::{KeyStoreSigner, Signer, SigningKey};
pub use submitter::Submitter;
