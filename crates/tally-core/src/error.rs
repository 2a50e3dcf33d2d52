//! Error types shared across Tally crates.
use thiserror::Error;

/// Failure of a call against a wallet daemon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The daemon could not be reached (connection refused, timeout, bad HTTP status).
    #[error("transport: {0}")]
    Transport(String),

    /// The daemon answered with a JSON-RPC error object.
    #[error("daemon error {code}: {message}")]
    Daemon { code: i64, message: String },

    /// The daemon answered but the result did not have the expected shape.
    #[error("decode: {0}")]
    Decode(String),
}

impl RpcError {
    /// True for failures reaching the daemon, as opposed to the daemon refusing the call.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Failure of the key-value persistence layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("serialization: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
