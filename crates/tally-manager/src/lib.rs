//! # tally-manager: the multi-coin wallet controller.
//!
//! - [`controller::WalletController`]: owns every wallet, runs balance and price sweeps
//! - [`pricing`]: price boundary and the CryptoCompare HTTP source
//! - [`storage`]: in-memory and JSON-file key-value stores
//! - [`config`]: manager settings and the coin/wallet definition files

pub mod config;
pub mod controller;
pub mod error;
pub mod pricing;
pub mod storage;

pub use crate::config::ManagerConfig;
pub use controller::WalletController;
pub use error::{ConfigError, PriceError};
pub use pricing::{CryptoCompareFetcher, PriceFetcher};
pub use storage::{JsonFileStore, MemoryStore};
