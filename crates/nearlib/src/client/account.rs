//! Acting as a single account.

use super::builder::Intent;
use super::near::Near;
use crate::error::Error;
use crate::types::{
    AccountId, AccountView, ExecutionSuccess, KeyPair, NearToken, PublicKey, TransactionHandle,
};

/// An account the client can read and sign for.
///
/// Obtained from [`Near::account`]. Transactions are signed with the active
/// key for this account in the client's key store.
///
/// # Example
///
/// ```rust,no_run
/// # use nearlib::*;
/// # async fn example(near: Near) -> Result<(), nearlib::Error> {
/// let alice = near.account("alice.near")?;
///
/// let (handle, key) = alice
///     .create_account_with_random_key("bob.alice.near", NearToken::near(1))
///     .await?;
/// near.wait_for_transaction_result(&handle)
///     .await
///     .into_result(&handle)?;
/// println!("bob's key: {}", key.public_key);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Account {
    near: Near,
    account_id: AccountId,
}

impl Account {
    pub(crate) fn new(near: Near, account_id: AccountId) -> Self {
        Self { near, account_id }
    }

    pub fn id(&self) -> &AccountId {
        &self.account_id
    }

    /// Current on-chain state.
    pub async fn state(&self) -> Result<AccountView, Error> {
        self.near.view_account(&self.account_id).await
    }

    /// Liquid balance.
    pub async fn balance(&self) -> Result<NearToken, Error> {
        Ok(self.state().await?.amount)
    }

    /// Create `new_account_id` owned by `public_key`, funded with `amount`.
    ///
    /// Returns once the node has accepted the transaction.
    pub async fn create_account(
        &self,
        new_account_id: impl AsRef<str>,
        public_key: PublicKey,
        amount: NearToken,
    ) -> Result<TransactionHandle, Error> {
        let intent = Intent::create_account(new_account_id.as_ref().parse()?, public_key, amount);
        self.near.submit_transaction(intent, &self.account_id).await
    }

    /// Create `new_account_id` with a freshly generated key.
    ///
    /// The key is stored under the new account in the client's key store
    /// before the transaction is sent.
    pub async fn create_account_with_random_key(
        &self,
        new_account_id: impl AsRef<str>,
        amount: NearToken,
    ) -> Result<(TransactionHandle, KeyPair), Error> {
        let new_account_id: AccountId = new_account_id.as_ref().parse()?;
        let key_pair = KeyPair::random();
        self.near
            .key_store()
            .set_key(&new_account_id, key_pair.clone())?;

        let intent = Intent::create_account(new_account_id, key_pair.public_key, amount);
        let handle = self.near.submit_transaction(intent, &self.account_id).await?;
        Ok((handle, key_pair))
    }

    /// Transfer `amount` to `receiver_id` and wait for it to complete.
    pub async fn send_money(
        &self,
        receiver_id: impl AsRef<str>,
        amount: NearToken,
    ) -> Result<ExecutionSuccess, Error> {
        let intent = Intent::transfer(receiver_id.as_ref().parse()?, amount);
        self.near.execute(intent, &self.account_id, None).await
    }

    /// Deploy `code` to this account. Returns once the node has accepted it.
    pub async fn deploy_contract(
        &self,
        code: impl Into<Vec<u8>>,
    ) -> Result<TransactionHandle, Error> {
        self.near.deploy_contract(&self.account_id, code).await
    }
}
