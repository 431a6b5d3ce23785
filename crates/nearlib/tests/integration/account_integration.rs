//! Account creation, transfers and key handling.

use nearlib::*;
use tokio_test::{assert_err, assert_ok};

use crate::common::{ALICE, ALICE_BALANCE, setup};

#[tokio::test]
async fn test_view_predefined_account() {
    let env = setup();

    let view = env.near.view_account(ALICE).await.unwrap();
    assert_eq!(view.account_id.as_str(), ALICE);
    assert_eq!(view.amount, NearToken::yocto(ALICE_BALANCE));
}

#[tokio::test]
async fn test_create_account_then_view() {
    let env = setup();
    let alice = env.alice();
    let public_key: PublicKey = "9AhWenZ3JddamBoyMqnTbp7yVbRuvqAv3zwfrWgfVRJE".parse().unwrap();

    let handle = alice
        .create_account("bob.test", public_key, NearToken::yocto(1))
        .await
        .unwrap();
    let outcome = env.near.wait_for_transaction_result(&handle).await;
    assert_eq!(outcome.status(), "Completed");

    let bob = env.near.view_account("bob.test").await.unwrap();
    assert_eq!(
        bob,
        AccountView {
            account_id: "bob.test".parse().unwrap(),
            nonce: 0,
            amount: NearToken::yocto(1),
            code_hash: CryptoHash::ZERO,
            stake: NearToken::ZERO,
        }
    );
    assert_eq!(
        alice.balance().await.unwrap(),
        NearToken::yocto(ALICE_BALANCE - 1)
    );
}

#[tokio::test]
async fn test_create_account_with_random_key() {
    let env = setup();
    let alice = env.alice();
    let before = alice.state().await.unwrap();

    let (handle, key_pair) = alice
        .create_account_with_random_key("carol.test", NearToken::yocto(2))
        .await
        .unwrap();
    assert!(env.near.wait_for_transaction_result(&handle).await.is_completed());

    let carol: AccountId = "carol.test".parse().unwrap();
    let stored = env.key_store.get_key(&carol).unwrap().unwrap();
    assert_eq!(stored.public_key, key_pair.public_key);

    let view = env.near.view_account("carol.test").await.unwrap();
    assert_eq!(view.nonce, 0);
    assert_eq!(view.amount, NearToken::yocto(2));
    assert_eq!(view.code_hash, CryptoHash::ZERO);

    let after = alice.state().await.unwrap();
    assert_eq!(after.amount, before.amount - NearToken::yocto(2));

    // The stored key signs for the new account.
    let carol_account = env.near.account("carol.test").unwrap();
    assert_ok!(carol_account.send_money(ALICE, NearToken::yocto(1)).await);
    assert_eq!(
        env.near.view_account("carol.test").await.unwrap().amount,
        NearToken::yocto(1)
    );
}

#[tokio::test]
async fn test_send_money() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);

    let success = env
        .alice()
        .send_money("bob.near", NearToken::yocto(7))
        .await
        .unwrap();
    assert!(success.logs.is_empty());
    assert_eq!(
        env.near.view_account("bob.near").await.unwrap().amount,
        NearToken::yocto(7)
    );
    assert_eq!(env.near.view_account(ALICE).await.unwrap().nonce, 1);
}

#[tokio::test]
async fn test_send_money_to_missing_account_fails_with_reason() {
    let env = setup();

    let err = env
        .alice()
        .send_money("nobody.near", NearToken::yocto(1))
        .await
        .unwrap_err();
    assert!(err.is_known_failure());
    assert!(matches!(err, Error::ExecutionFailed { .. }));
    assert!(err.to_string().contains("AccountDoesNotExist"));
    // The failed transaction still used its nonce.
    assert_eq!(env.near.view_account(ALICE).await.unwrap().nonce, 1);
}

#[tokio::test]
async fn test_missing_key_never_reaches_node() {
    let env = setup();
    env.ledger.add_account("dave.near", NearToken::yocto(5), None);

    let err = env
        .near
        .account("dave.near")
        .unwrap()
        .send_money(ALICE, NearToken::yocto(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotFound(ref id) if id.as_str() == "dave.near"));
    assert_eq!(env.ledger.submissions(), 0);
}

#[tokio::test]
async fn test_invalid_intents_never_reach_node() {
    let env = setup();
    let alice = env.alice();

    assert_err!(alice.send_money("bob.near", NearToken::ZERO).await);
    assert_err!(alice.send_money(ALICE, NearToken::yocto(1)).await);
    assert_err!(alice.deploy_contract(Vec::new()).await);
    assert_eq!(env.ledger.submissions(), 0);
    assert_eq!(env.near.nonces().peek(&ALICE.parse().unwrap()), None);
}

#[tokio::test]
async fn test_rotated_key_signs_next_transaction() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);
    let alice_id: AccountId = ALICE.parse().unwrap();

    // The ledger does not know the new key, so the node rejects it.
    env.key_store.set_key(&alice_id, KeyPair::random()).unwrap();
    let err = env
        .alice()
        .send_money("bob.near", NearToken::yocto(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RejectedBySyntax { .. }));
    assert!(err.to_string().contains("AccessKeyNotFound"));
}
