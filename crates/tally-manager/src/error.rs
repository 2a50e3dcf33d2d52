//! Manager error types.

use std::path::PathBuf;

use thiserror::Error;

/// Price source failures. Always confined to one ticker by the sweep.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Request could not be sent or the server answered with a bad status.
    #[error("http: {0}")]
    Http(String),

    /// Body was not a currency -> number object.
    #[error("decode: {0}")]
    Decode(String),

    /// The price API reported an error for this ticker.
    #[error("api: {0}")]
    Api(String),
}

impl From<reqwest::Error> for PriceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// Settings and definition file failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
