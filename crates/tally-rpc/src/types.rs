//! Daemon result shapes that are not domain types.

use serde::{Deserialize, Serialize};

/// Subset of `getinfo` the manager looks at. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonInfo {
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub blocks: Option<u64>,
    #[serde(default)]
    pub connections: Option<u64>,
}

/// Result of `signrawtransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub hex: String,
    #[serde(default)]
    pub complete: bool,
}
