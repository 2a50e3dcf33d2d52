//! Persisted transaction history for one wallet.
//!
//! Records live under `TRANSACTIONS_<TICKER>` and the time of the last
//! daemon fetch under `TX_LAST_FETCH_TIME_<TICKER>`. Records are merged by
//! txid and never removed.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use tally_core::constants::storage_keys;
use tally_core::error::StorageError;
use tally_core::traits::KeyValueStore;
use tally_core::types::TransactionRecord;

/// Resolve a `[start, end]` query window.
///
/// `end == 0` means `now`; an `end` before `start` collapses to `[start, start]`.
pub fn normalize_range(start: i64, end: i64, now: i64) -> (i64, i64) {
    let end = if end == 0 { now } else { end };
    if end < start { (start, start) } else { (start, end) }
}

/// Handle on one wallet's history in a shared store.
#[derive(Clone)]
pub struct TransactionHistory {
    ticker: String,
    store: Arc<dyn KeyValueStore>,
}

impl TransactionHistory {
    pub fn new(ticker: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            ticker: ticker.into(),
            store,
        }
    }

    /// Every stored record, oldest first. A malformed entry reads as empty.
    pub fn load(&self) -> Vec<TransactionRecord> {
        let key = storage_keys::transactions(&self.ticker);
        let Some(value) = self.store.get(&key) else {
            return Vec::new();
        };
        match serde_json::from_value(value) {
            Ok(records) => records,
            Err(e) => {
                warn!(ticker = %self.ticker, error = %e, "malformed stored transactions");
                Vec::new()
            }
        }
    }

    /// Stored records with `start <= time <= end`.
    pub fn in_range(&self, start: i64, end: i64) -> Vec<TransactionRecord> {
        self.load()
            .into_iter()
            .filter(|tx| tx.time >= start && tx.time <= end)
            .collect()
    }

    /// Merge `records` into the stored history.
    ///
    /// A record whose txid is already stored replaces the stored copy.
    /// Returns `false` without touching the store when `records` is empty.
    pub fn add(&self, records: &[TransactionRecord]) -> Result<bool, StorageError> {
        if records.is_empty() {
            return Ok(false);
        }

        let mut merged = self.load();
        let mut index: HashMap<String, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, tx)| (tx.txid.clone(), i))
            .collect();

        for record in records {
            match index.get(&record.txid) {
                Some(&i) => merged[i] = record.clone(),
                None => {
                    index.insert(record.txid.clone(), merged.len());
                    merged.push(record.clone());
                }
            }
        }
        merged.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.txid.cmp(&b.txid)));

        let value = serde_json::to_value(&merged)?;
        self.store
            .set(&storage_keys::transactions(&self.ticker), value)?;
        Ok(true)
    }

    /// Unix time of the last daemon fetch; zero if never fetched.
    pub fn last_fetch_time(&self) -> i64 {
        self.store
            .get(&storage_keys::tx_last_fetch_time(&self.ticker))
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
            .max(0)
    }

    pub fn set_last_fetch_time(&self, time: i64) -> Result<(), StorageError> {
        self.store.set(
            &storage_keys::tx_last_fetch_time(&self.ticker),
            json!(time.max(0)),
        )
    }
}
