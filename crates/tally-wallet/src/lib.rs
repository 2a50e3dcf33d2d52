//! # tally-wallet: one coin's wallet over its daemon.
//!
//! Wraps a daemon binding with cached address/UTXO state, persisted
//! transaction history, and a send pipeline built on coin selection.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`coin_selection`]: sufficient-single-else-largest-first UTXO selection
//! - [`builder`]: Transaction builder producing daemon inputs/outputs
//! - [`cache`]: Timestamped cache cells
//! - [`history`]: Persisted, deduplicated transaction history
//! - [`wallet`]: High-level wallet composition

pub mod builder;
pub mod cache;
pub mod coin_selection;
pub mod error;
pub mod history;
pub mod wallet;

#[cfg(test)]
mod test_support;

// Re-exports for convenient access
pub use builder::TransactionBuilder;
pub use cache::Cached;
pub use coin_selection::{CoinSelection, CoinSelector};
pub use error::WalletError;
pub use history::TransactionHistory;
pub use wallet::{Wallet, WalletView};
