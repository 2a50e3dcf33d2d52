//! Wallet error types.

use tally_core::amount::Amount;
use tally_core::error::{RpcError, StorageError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Spendable UTXOs do not cover the recipients plus fee.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Spendable total in coins.
        have: Amount,
        /// Recipients plus fee in coins.
        need: Amount,
    },

    /// No spendable UTXOs at all.
    #[error("no spendable UTXOs")]
    NoUtxos,

    /// Malformed recipient or empty recipient list.
    #[error("validation: {0}")]
    Validation(String),

    /// The wallet has RPC disabled.
    #[error("rpc disabled for {0}")]
    Disabled(String),

    /// The builder produced a transaction that does not balance.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Daemon call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Persistence failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
