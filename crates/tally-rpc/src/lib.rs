//! # tally-rpc: JSON-RPC access to per-coin wallet daemons.
//!
//! - [`transport`]: the `invoke(method, params)` boundary and its jsonrpsee
//!   HTTP implementation
//! - [`client`]: typed wrappers for the daemon methods the manager uses, and
//!   [`RpcBinding`], which makes a disabled wallet an explicit variant
//! - [`types`]: daemon result shapes that are not domain types

pub mod client;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{RpcBinding, RpcClient, methods};
pub use transport::{Connector, HttpConnector, HttpTransport, RpcTransport};
pub use types::{DaemonInfo, SignedTransaction};
