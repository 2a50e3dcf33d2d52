//! Shared fixtures for this crate's unit tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use tally_core::error::StorageError;
use tally_core::traits::KeyValueStore;

/// In-memory store.
#[derive(Default)]
pub struct MapStore(RwLock<HashMap<String, Value>>);

impl KeyValueStore for MapStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.0.write().insert(key.to_string(), value);
        Ok(())
    }
}
