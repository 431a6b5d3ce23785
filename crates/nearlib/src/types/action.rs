//! Transaction action types.
//!
//! Every transaction carries exactly one action. The action names its own
//! receiver, so the transaction envelope only holds signer, key and nonce.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{AccountId, Gas, NearToken, PublicKey};

/// A single ledger action.
///
/// Variant order is the Borsh discriminant and must not change:
/// 0 = CreateAccount, 1 = DeployContract, 2 = FunctionCall, 3 = Transfer.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Action {
    /// Create and fund a new account. (discriminant = 0)
    CreateAccount(CreateAccountAction),
    /// Deploy contract code to the signer's own account. (discriminant = 1)
    DeployContract(DeployContractAction),
    /// Call a contract method. (discriminant = 2)
    FunctionCall(FunctionCallAction),
    /// Transfer tokens. (discriminant = 3)
    Transfer(TransferAction),
}

/// Create a new account owned by `public_key`, funded from the signer.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateAccountAction {
    pub new_account_id: AccountId,
    pub public_key: PublicKey,
    pub amount: NearToken,
}

/// Deploy contract code.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeployContractAction {
    /// WASM code to deploy.
    pub code: Vec<u8>,
}

/// Call a contract function.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallAction {
    pub contract_id: AccountId,
    pub method_name: String,
    /// JSON-encoded arguments.
    pub args: Vec<u8>,
    pub gas: Gas,
    pub deposit: NearToken,
}

/// Transfer tokens.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferAction {
    pub receiver_id: AccountId,
    pub amount: NearToken,
}

impl Action {
    /// The account the action lands on. Deploys land on the signer.
    pub fn receiver_id<'a>(&'a self, signer_id: &'a AccountId) -> &'a AccountId {
        match self {
            Action::CreateAccount(a) => &a.new_account_id,
            Action::DeployContract(_) => signer_id,
            Action::FunctionCall(a) => &a.contract_id,
            Action::Transfer(a) => &a.receiver_id,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateAccount(_) => "create_account",
            Action::DeployContract(_) => "deploy_contract",
            Action::FunctionCall(_) => "function_call",
            Action::Transfer(_) => "transfer",
        }
    }
}
