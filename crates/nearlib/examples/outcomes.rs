//! Handling every way a transaction can end
//!
//! Submits a call, then waits with a short budget so the poll may stop
//! before the node reports a result. A timed-out handle can be polled again.
//!
//! Run: NEAR_ACCOUNT_ID=alice.near NEAR_PRIVATE_KEY=ed25519:... \
//!      NEAR_CONTRACT_ID=hello.near cargo run --example outcomes

use std::sync::Arc;
use std::time::Duration;

use nearlib::*;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let account_id = std::env::var("NEAR_ACCOUNT_ID").unwrap_or_else(|_| "alice.near".into());
    let private_key = std::env::var("NEAR_PRIVATE_KEY").unwrap_or_default();
    let contract_id = std::env::var("NEAR_CONTRACT_ID").unwrap_or_else(|_| "hello.near".into());

    let key_store = Arc::new(InMemoryKeyStore::from_keys(&[(
        account_id.as_str(),
        private_key.as_str(),
    )])?);
    let near = Near::builder()
        .config(ConnectionConfig::from_env()?)
        .key_store(key_store)
        .build();

    let intent = Intent::function_call(
        contract_id.parse()?,
        "setValue",
        &json!({ "value": "42" }),
    );
    let handle = match near.submit_transaction(intent, &account_id).await {
        Ok(handle) => handle,
        Err(e) if e.is_known_failure() => {
            println!("Rejected before queueing: {e}");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    println!("Submitted {handle}");

    let mut outcome = near
        .wait_for_transaction_result_with_timeout(&handle, Duration::from_millis(500))
        .await;
    if let TransactionOutcome::TimedOut { elapsed } = outcome {
        // Not resubmitted: the transaction may still land.
        println!("No result after {elapsed:?}, polling again");
        outcome = near.wait_for_transaction_result(&handle).await;
    }

    match outcome {
        TransactionOutcome::Completed { logs, .. } => println!("Completed with logs {logs:?}"),
        TransactionOutcome::Failed { reason, logs } => {
            println!("Failed: {reason}");
            for line in logs {
                println!("  {line}");
            }
        }
        TransactionOutcome::TimedOut { .. } => println!("Still unknown; check {handle} later"),
    }

    Ok(())
}
