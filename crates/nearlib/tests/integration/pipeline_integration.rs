//! Nonce sequencing, submission and polling through the whole pipeline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use nearlib::*;
use serde_json::json;

use crate::common::{ALICE, ALICE_BALANCE, TestEnv, setup};

const BOB: &str = "bob.near";

const CONTRACT: &str = "hello.test";

async fn setup_with_contract() -> (TestEnv, Contract) {
    let env = setup();
    env.deploy_hello(CONTRACT).await;
    let contract = env
        .near
        .load_contract(
            CONTRACT,
            ContractOptions::new(ALICE)
                .unwrap()
                .view_methods(["getValue"])
                .change_methods(["setValue", "generateLogs", "triggerAssert"]),
        )
        .unwrap();
    (env, contract)
}

fn standalone_pipeline(env: &TestEnv) -> (Arc<TransactionBuilder>, Submitter) {
    let nonces = Arc::new(NonceTracker::new(env.ledger.clone()));
    let builder = TransactionBuilder::new(
        Arc::new(KeyStoreSigner::new(env.key_store.clone())),
        nonces.clone(),
    );
    (Arc::new(builder), Submitter::new(env.ledger.clone(), nonces))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_builds_get_distinct_nonces() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);
    let (builder, submitter) = standalone_pipeline(&env);
    let alice: AccountId = ALICE.parse().unwrap();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let builder = builder.clone();
            let alice = alice.clone();
            tokio::spawn(async move {
                let intent = Intent::transfer("bob.near".parse().unwrap(), NearToken::yocto(1));
                builder.build(&intent, &alice).await
            })
        })
        .collect();

    let mut signed = Vec::new();
    for task in tasks {
        signed.push(task.await.unwrap().unwrap());
    }
    let nonces: HashSet<u64> = signed.iter().map(|tx| tx.transaction().nonce).collect();
    assert_eq!(nonces, (1..=20).collect::<HashSet<u64>>());

    // The node only accepts increasing nonces, so submit in order.
    signed.sort_by_key(|tx| tx.transaction().nonce);
    let mut handles = HashSet::new();
    for tx in &signed {
        assert!(handles.insert(submitter.submit(tx).await.unwrap()));
    }
    for handle in &handles {
        assert!(env.near.wait_for_transaction_result(handle).await.is_completed());
    }

    let view = env.near.view_account(ALICE).await.unwrap();
    assert_eq!(view.nonce, 20);
    assert_eq!(view.amount, NearToken::yocto(ALICE_BALANCE - 20));
    assert_eq!(
        env.near.view_account("bob.near").await.unwrap().amount,
        NearToken::yocto(20)
    );
}

#[tokio::test]
async fn test_sequential_sends_use_consecutive_nonces() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);
    let alice = env.alice();

    for expected in 1..=3 {
        alice.send_money("bob.near", NearToken::yocto(1)).await.unwrap();
        assert_eq!(env.near.view_account(ALICE).await.unwrap().nonce, expected);
    }
}

#[tokio::test]
async fn test_resubmitted_transaction_is_rejected() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);

    let (builder, submitter) = standalone_pipeline(&env);

    let signed = builder
        .build(
            &Intent::transfer("bob.near".parse().unwrap(), NearToken::yocto(1)),
            &ALICE.parse().unwrap(),
        )
        .await
        .unwrap();
    let handle = submitter.submit(&signed).await.unwrap();
    assert_eq!(handle.hash(), signed.hash());

    let err = submitter.submit(&signed).await.unwrap_err();
    match &err {
        Error::RejectedBySyntax { source, .. } => {
            assert_eq!(source.stale_nonce(), Some(1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(env.ledger.submissions(), 2);

    // Executed once.
    assert!(env.near.wait_for_transaction_result(&handle).await.is_completed());
    assert_eq!(
        env.near.view_account("bob.near").await.unwrap().amount,
        NearToken::yocto(1)
    );
}

#[tokio::test]
async fn test_polling_completed_handle_is_stable() {
    let (env, _) = setup_with_contract().await;

    let handle = env
        .near
        .schedule_function_call(
            NearToken::ZERO,
            ALICE,
            CONTRACT,
            "generateLogs",
            &json!({}),
        )
        .await
        .unwrap();

    let first = env.near.wait_for_transaction_result(&handle).await;
    let second = env.near.wait_for_transaction_result(&handle).await;
    assert_eq!(first, second);
    assert_eq!(first.logs(), ["LOG: log1".to_string(), "LOG: log2".to_string()]);
}

#[tokio::test]
async fn test_zero_timeout_is_ambiguous() {
    let (env, contract) = setup_with_contract().await;
    let queries = env.ledger.status_queries();

    let err = contract
        .call_with(
            "setValue",
            &json!({ "value": "late" }),
            CallOptions {
                timeout: Some(Duration::ZERO),
                ..CallOptions::default()
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_ambiguous());
    assert!(!err.is_known_failure());
    assert_eq!(env.ledger.status_queries(), queries);

    // The transaction itself went through; a later poll finds it.
    let Error::AmbiguousTimeout { hash, .. } = err else {
        panic!("expected AmbiguousTimeout");
    };
    let outcome = env
        .near
        .wait_for_transaction_result(&TransactionHandle::new(hash))
        .await;
    assert!(outcome.is_completed());
    let value: String = contract.view("getValue", &json!({})).await.unwrap();
    assert_eq!(value, "late");
}

#[tokio::test]
async fn test_stalled_transaction_times_out_then_completes() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);
    env.ledger.hold(true);

    let handle = env
        .near
        .submit_transaction(
            Intent::transfer("bob.near".parse().unwrap(), NearToken::yocto(3)),
            ALICE,
        )
        .await
        .unwrap();

    let outcome = env
        .near
        .wait_for_transaction_result_with_timeout(&handle, Duration::from_millis(50))
        .await;
    match outcome {
        TransactionOutcome::TimedOut { elapsed } => {
            assert!(elapsed >= Duration::from_millis(50));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    env.ledger.hold(false);
    assert!(env.near.wait_for_transaction_result(&handle).await.is_completed());
}

#[tokio::test]
async fn test_failed_outcome_is_returned_not_raised() {
    let (env, _) = setup_with_contract().await;

    let intent = Intent::function_call(CONTRACT.parse().unwrap(), "triggerAssert", &json!({}));
    let outcome = env.near.send_transaction(intent, ALICE).await.unwrap();
    match outcome {
        TransactionOutcome::Failed { reason, logs } => {
            assert!(reason.contains("expected to fail"));
            assert_eq!(logs[0], "LOG: log before assert");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_stale_nonce_resyncs_for_next_transaction() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);
    let alice = env.alice();

    alice.send_money("bob.near", NearToken::yocto(1)).await.unwrap();
    // Another client uses alice's key behind our back.
    env.ledger.set_nonce(ALICE, 50);

    let err = alice
        .send_money("bob.near", NearToken::yocto(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RejectedBySyntax { .. }));
    assert_eq!(env.near.nonces().peek(&ALICE.parse().unwrap()), Some(51));

    alice.send_money("bob.near", NearToken::yocto(1)).await.unwrap();
    assert_eq!(env.near.view_account(ALICE).await.unwrap().nonce, 51);
}

#[tokio::test]
async fn test_slow_finality_still_completes() {
    let env = setup();
    env.ledger.add_account("bob.near", NearToken::ZERO, None);
    env.ledger.set_pending_rounds(5);

    let queries = env.ledger.status_queries();
    env.alice()
        .send_money("bob.near", NearToken::yocto(1))
        .await
        .unwrap();
    assert_eq!(env.ledger.status_queries() - queries, 6);
}

#[tokio::test]
async fn test_concurrent_polls_do_not_interfere() {
    let (env, _) = setup_with_contract().await;

    // Finality after 0, 4 and 12 status queries, plus one that never settles.
    let mut handles = Vec::new();
    for (value, rounds) in [("v0", 0), ("v4", 4), ("v12", 12), ("held", 0)] {
        env.ledger.set_pending_rounds(rounds);
        let handle = env
            .near
            .schedule_function_call(
                NearToken::ZERO,
                ALICE,
                CONTRACT,
                "setValue",
                &json!({ "value": value }),
            )
            .await
            .unwrap();
        handles.push((value, handle));
    }
    let held = handles[3].1;
    env.ledger.hold_transaction(held.hash(), true);

    let short = Duration::from_millis(100);
    let outcomes = join_all(handles.iter().map(|(value, handle)| {
        let timeout = if *value == "held" {
            short
        } else {
            Duration::from_secs(5)
        };
        env.near.wait_for_transaction_result_with_timeout(handle, timeout)
    }))
    .await;

    for ((value, _), outcome) in handles.iter().zip(&outcomes) {
        match outcome {
            TransactionOutcome::Completed {
                value: Some(bytes),
                ..
            } => {
                assert_ne!(*value, "held");
                assert_eq!(serde_json::from_slice::<String>(bytes).unwrap(), *value);
            }
            TransactionOutcome::TimedOut { elapsed } => {
                assert_eq!(*value, "held");
                assert!(*elapsed >= short);
            }
            other => panic!("unexpected outcome for {value}: {other:?}"),
        }
    }

    // The slowest handle outlived the timeout and still completed.
    assert!(outcomes[2].is_completed());

    env.ledger.hold_transaction(held.hash(), false);
    assert!(env.near.wait_for_transaction_result(&held).await.is_completed());
}

#[tokio::test]
async fn test_lost_acknowledgement_is_ambiguous_then_completes() {
    let env = setup();
    env.ledger.add_account(BOB, NearToken::ZERO, None);
    env.ledger.drop_acks(true);

    let err = env
        .alice()
        .send_money(BOB, NearToken::yocto(4))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SubmissionUnconfirmed { .. }));
    assert!(err.is_ambiguous());
    assert!(!err.is_known_failure());
    assert_eq!(env.ledger.submissions(), 1);

    // The node queued it anyway.
    env.ledger.drop_acks(false);
    let hash = err.pending_hash().unwrap();
    let outcome = env
        .near
        .wait_for_transaction_result(&TransactionHandle::new(hash))
        .await;
    assert!(outcome.is_completed());
    assert_eq!(
        env.near.view_account(BOB).await.unwrap().amount,
        NearToken::yocto(4)
    );

    // The nonce was not reused.
    env.alice().send_money(BOB, NearToken::yocto(1)).await.unwrap();
    assert_eq!(env.near.view_account(ALICE).await.unwrap().nonce, 2);
}
