//! Core types: identifiers, keys, amounts, transactions and node responses.

mod account;
mod action;
mod hash;
mod key;
mod outcome;
mod rpc;
mod transaction;
mod units;

pub use account::AccountId;
pub use action::{
    Action, CreateAccountAction, DeployContractAction, FunctionCallAction, TransferAction,
};
pub use hash::CryptoHash;
pub use key::{
    DEFAULT_HD_PATH, DEFAULT_WORD_COUNT, KeyPair, KeyType, PublicKey, SecretKey, Signature,
    generate_seed_phrase,
};
pub use outcome::{ExecutionSuccess, TransactionHandle, TransactionOutcome};
pub use rpc::{AccountView, SubmitResponse, TransactionStatusView, TxStatus, ViewFunctionResult};
pub use transaction::{SignedTransaction, Transaction};
pub use units::{Gas, NearToken};
