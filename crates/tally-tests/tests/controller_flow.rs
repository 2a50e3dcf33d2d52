//! Controller sweeps across several coins sharing one store.

use std::sync::Arc;

use serde_json::json;
use tally_core::constants::storage_keys;
use tally_core::error::RpcError;
use tally_core::traits::KeyValueStore;
use tally_manager::{JsonFileStore, MemoryStore};
use tally_rpc::methods;
use tally_rpc::testing::{SPENDABLE_BALANCE, TOTAL_BALANCE};
use tally_tests::helpers::*;

#[test]
fn loads_known_coins_only() {
    let f = fixture();
    let tickers: Vec<&str> = f.controller.wallets().map(|w| w.ticker()).collect();
    assert_eq!(tickers, vec!["BLOCK", "BTC", "LTC"]);

    let enabled: Vec<&str> = f.controller.enabled_wallets().map(|w| w.ticker()).collect();
    assert_eq!(enabled, vec!["BLOCK", "LTC"]);
}

#[test]
fn views_do_not_leak_credentials() {
    let f = fixture();
    let rendered = serde_json::to_string(&f.controller.wallet_views()).unwrap();
    assert!(!rendered.contains("s3cret"));
    assert!(rendered.contains("Blocknet"));
}

#[tokio::test]
async fn balance_sweep_covers_enabled_wallets() {
    let mut f = fixture();
    assert!(f.controller.update_all_balances().await.unwrap());

    let balances = f.controller.balances();
    assert_eq!(balances.len(), 2);
    assert_eq!(balances["BLOCK"].total, TOTAL_BALANCE);
    assert_eq!(balances["LTC"].spendable, SPENDABLE_BALANCE);
    assert_eq!(f.connector.transport(BTC_PORT).total_calls(), 0);
}

#[tokio::test]
async fn balance_sweep_survives_one_dead_daemon() {
    let mut f = fixture();
    f.connector
        .transport(BLOCK_PORT)
        .fail(methods::LIST_UNSPENT, RpcError::Transport("connection refused".into()));

    assert!(f.controller.update_all_balances().await.unwrap());
    let balances = f.controller.balances();
    assert!(!balances.contains_key("BLOCK"));
    assert!(balances.contains_key("LTC"));
}

#[tokio::test]
async fn stale_balance_kept_when_daemon_goes_down() {
    let mut f = fixture();
    f.controller.update_all_balances().await.unwrap();

    f.connector
        .transport(LTC_PORT)
        .fail(methods::LIST_UNSPENT, RpcError::Transport("timeout".into()));
    f.connector
        .transport(BLOCK_PORT)
        .respond(methods::LIST_UNSPENT, json!([]));

    assert!(f.controller.update_all_balances().await.unwrap());
    let balances = f.controller.balances();
    assert_eq!(balances["BLOCK"].total, "0.00000000");
    assert_eq!(balances["LTC"].total, TOTAL_BALANCE);
}

#[tokio::test]
async fn price_sweep_failure_degrades_single_ticker() {
    let f = fixture();
    let prices = FixedPrices::new(&[("BLOCK", 1.044)]);
    let multipliers = f.controller.update_price_multipliers(&prices).await.unwrap();

    assert_eq!(multipliers.len(), 2);
    assert_eq!(multipliers["BLOCK"]["USD"], 1.044);
    assert!(multipliers["LTC"].is_empty());
    assert_eq!(f.controller.currency_multipliers(), multipliers);
}

#[tokio::test]
async fn state_survives_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let store = Arc::new(JsonFileStore::open(&path).unwrap());
        let mut f = fixture_with_store(store);
        f.controller.update_all_balances().await.unwrap();
        f.controller
            .update_price_multipliers(&FixedPrices::new(&[("BLOCK", 2.0), ("LTC", 50.0)]))
            .await
            .unwrap();
    }

    let reopened = Arc::new(JsonFileStore::open(&path).unwrap());
    let f = fixture_with_store(reopened);
    assert_eq!(f.controller.balances()["BLOCK"].total, TOTAL_BALANCE);
    assert_eq!(f.controller.currency_multipliers()["LTC"]["EUR"], 50.0);
}

#[test]
fn malformed_persisted_maps_read_as_empty() {
    let store = Arc::new(MemoryStore::new());
    let f = fixture_with_store(store.clone());
    store
        .set(storage_keys::ALT_CURRENCY_MULTIPLIERS, json!([1, 2, 3]))
        .unwrap();
    assert!(f.controller.currency_multipliers().is_empty());
}
