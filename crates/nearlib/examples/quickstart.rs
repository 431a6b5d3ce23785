//! Quickstart - Essential node operations
//!
//! Covers: account state, view calls, transfers, contract calls
//!
//! Run: cargo run --example quickstart
//!
//! Connection settings come from the environment:
//!   NEAR_NODE_URL=http://localhost:3030
//!   NEAR_NETWORK_ID=localnet
//!
//! Set these for write operations:
//!   NEAR_ACCOUNT_ID=alice.near
//!   NEAR_PRIVATE_KEY=ed25519:...

use std::sync::Arc;

use nearlib::*;
use serde_json::json;

// ============================================================================
// 1. Read state (no credentials needed)
// ============================================================================

async fn view_example(near: &Near, account_id: &str) -> Result<(), Error> {
    println!("=== View Example ===\n");

    let state = near.view_account(account_id).await?;
    println!("{account_id} holds {} at nonce {}", state.amount, state.nonce);
    println!("Has contract: {}", state.has_contract());

    Ok(())
}

// ============================================================================
// 2. Transfer tokens
// ============================================================================

async fn transfer_example(account: &Account, receiver: &str) -> Result<(), Error> {
    println!("\n=== Transfer Example ===\n");

    let success = account.send_money(receiver, NearToken::millinear(100)).await?;
    println!("Sent 0.1 NEAR to {receiver}: {}", success.hash);

    Ok(())
}

// ============================================================================
// 3. Contract calls
// ============================================================================

async fn contract_example(near: &Near, sender: &str, contract_id: &str) -> Result<(), Error> {
    println!("\n=== Contract Example ===\n");

    let contract = near.load_contract(
        contract_id,
        ContractOptions::new(sender)?
            .view_methods(["getValue"])
            .change_methods(["setValue"]),
    )?;

    let result = contract.call("setValue", &json!({ "value": "hello" })).await?;
    println!("setValue returned {:?}", result.json::<serde_json::Value>());

    let value: String = contract.view("getValue", &json!({})).await?;
    println!("getValue: {value}");

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("nearlib Quickstart\n");

    let account_id = std::env::var("NEAR_ACCOUNT_ID").ok();
    let private_key = std::env::var("NEAR_PRIVATE_KEY").ok();

    match (account_id, private_key) {
        (Some(account_id), Some(private_key)) => {
            let key_store = Arc::new(InMemoryKeyStore::from_keys(&[(
                account_id.as_str(),
                private_key.as_str(),
            )])?);
            let near = Near::builder()
                .config(ConnectionConfig::from_env()?)
                .key_store(key_store)
                .build();

            view_example(&near, &account_id).await?;
            transfer_example(&near.account(&account_id)?, "bob.near").await?;

            let contract_id =
                std::env::var("NEAR_CONTRACT_ID").unwrap_or_else(|_| account_id.clone());
            contract_example(&near, &account_id, &contract_id).await?;
        }
        _ => {
            let near = Near::from_env()?;
            view_example(&near, "alice.near").await?;
            println!("\nSet NEAR_ACCOUNT_ID and NEAR_PRIVATE_KEY to run write examples.");
        }
    }

    Ok(())
}
