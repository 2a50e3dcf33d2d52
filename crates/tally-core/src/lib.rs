//! # tally-core
//! Foundation types and traits for the Tally wallet manager.
//!
//! - [`amount`]: exact decimal coin amounts
//! - [`types`]: coin descriptors, wallet configs, UTXOs, history records
//! - [`constants`]: fee defaults, cache windows, storage keys
//! - [`error`]: RPC and storage error enums
//! - [`traits`]: persistence and clock boundaries

pub mod amount;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use amount::Amount;
pub use error::{RpcError, StorageError};
pub use traits::{Clock, KeyValueStore, SystemClock};
pub use types::{
    Balance, CoinDescriptor, FeePolicy, PriceMultipliers, Recipient, RpcEndpoint, TransactionRecord,
    TxCategory, TxInput, TxOutput, Utxo, WalletConfig,
};
