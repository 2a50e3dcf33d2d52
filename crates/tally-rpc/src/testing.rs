//! Scripted daemon for tests.
//!
//! [`FakeTransport`] answers every daemon method with canned data, records
//! each call, and can be told to fail individual methods.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use tally_core::error::RpcError;
use tally_core::types::RpcEndpoint;

use crate::client::methods;
use crate::transport::{Connector, RpcTransport};

/// Addresses the fake daemon reports as belonging to the wallet.
pub const OWN_ADDRESSES: [&str; 2] = [
    "yLDs4UKRQm7yeZXAGdQFLFcoouw3aAddYt",
    "y9kQ3NzVv8qjv1Y5hB7ZcVUVjKyfuA7K2W",
];

/// An address outside the wallet.
pub const FOREIGN_ADDRESS: &str = "yKjhThbgKHNh9iQYL2agreSAvw5tmJGkNW";

pub const NEW_ADDRESS: &str = "yK75ZDnqpgFraLBhLcrDcqt1iKLdT1egzs";
pub const RAW_TX: &str = "0100000001raw";
pub const SIGNED_TX: &str = "0100000001signed";
pub const BROADCAST_TXID: &str =
    "f2b3e2b0a7c1d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d";

/// Sum of every default UTXO.
pub const TOTAL_BALANCE: &str = "118.37345678";
/// Sum of the spendable default UTXOs.
pub const SPENDABLE_BALANCE: &str = "117.62345678";

fn default_unspent() -> Value {
    json!([
        {
            "txid": "a8f44288f3a99972db939185deabfc2c716ba7e78cd99624657ba061d19600a0",
            "vout": 0,
            "address": OWN_ADDRESSES[0],
            "amount": 15.0,
            "scriptPubKey": "76a914fef1b70a09539048b384163e2724c6bd1d2402ea88ac",
            "spendable": true,
            "confirmations": 525
        },
        {
            "txid": "b14cd2e9a0b9d1c47a3c44e4a1f1d1c1e5b6a7d8c9e0f1a2b3c4d5e6f7a8b9c0",
            "vout": 1,
            "address": OWN_ADDRESSES[1],
            "amount": 2.5,
            "scriptPubKey": "76a9142b6f0e5a4a3f9c1f1f4e2f2a6d0b0c7e8d9f0a1b88ac",
            "spendable": true,
            "confirmations": 12
        },
        {
            "txid": "c27a8e1f0d9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a39281706f5e4d3c2b1a0f9e",
            "vout": 0,
            "address": OWN_ADDRESSES[0],
            "amount": 0.75,
            "scriptPubKey": "76a914fef1b70a09539048b384163e2724c6bd1d2402ea88ac",
            "spendable": false,
            "confirmations": 0
        },
        {
            "txid": "d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4",
            "vout": 2,
            "address": OWN_ADDRESSES[1],
            "amount": 100.12345678,
            "scriptPubKey": "76a9142b6f0e5a4a3f9c1f1f4e2f2a6d0b0c7e8d9f0a1b88ac",
            "spendable": true,
            "confirmations": 3000
        }
    ])
}

fn default_transactions() -> Value {
    json!([
        {"txid": "tx-receive-own", "address": OWN_ADDRESSES[0], "amount": 15.0,
         "time": 1_596_654_100, "category": "receive", "confirmations": 525},
        {"txid": "tx-receive-foreign", "address": FOREIGN_ADDRESS, "amount": 3.0,
         "time": 1_596_654_150, "category": "receive", "confirmations": 400},
        {"txid": "tx-send", "address": FOREIGN_ADDRESS, "amount": -1.0,
         "time": 1_596_654_200, "category": "send", "confirmations": 300},
        {"txid": "tx-receive-own-2", "address": OWN_ADDRESSES[1], "amount": 2.5,
         "time": 1_596_654_300, "category": "receive", "confirmations": 12}
    ])
}

/// Scripted [`RpcTransport`].
pub struct FakeTransport {
    responses: Mutex<HashMap<String, Result<Value, RpcError>>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl FakeTransport {
    /// A daemon with a funded wallet and working send path.
    pub fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            methods::GET_INFO.to_string(),
            Ok(json!({"version": 4030000, "blocks": 1_500_000, "connections": 8})),
        );
        responses.insert(methods::LIST_UNSPENT.to_string(), Ok(default_unspent()));
        responses.insert(
            methods::LIST_TRANSACTIONS.to_string(),
            Ok(default_transactions()),
        );
        responses.insert(
            methods::GET_ADDRESSES_BY_ACCOUNT.to_string(),
            Ok(json!(OWN_ADDRESSES)),
        );
        responses.insert(methods::GET_NEW_ADDRESS.to_string(), Ok(json!(NEW_ADDRESS)));
        responses.insert(methods::CREATE_RAW_TRANSACTION.to_string(), Ok(json!(RAW_TX)));
        responses.insert(
            methods::SIGN_RAW_TRANSACTION.to_string(),
            Ok(json!({"hex": SIGNED_TX, "complete": true})),
        );
        responses.insert(
            methods::SEND_RAW_TRANSACTION.to_string(),
            Ok(json!(BROADCAST_TXID)),
        );
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `method` with `value` from now on.
    pub fn respond(&self, method: &str, value: Value) {
        self.responses.lock().insert(method.to_string(), Ok(value));
    }

    /// Fail `method` with `err` from now on.
    pub fn fail(&self, method: &str, err: RpcError) {
        self.responses.lock().insert(method.to_string(), Err(err));
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RpcTransport for FakeTransport {
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.calls.lock().push((method.to_string(), params.clone()));
        let response = self
            .responses
            .lock()
            .get(method)
            .cloned()
            .unwrap_or_else(|| {
                Err(RpcError::Daemon {
                    code: -32601,
                    message: "Method not found".into(),
                })
            })?;

        if method == methods::LIST_TRANSACTIONS {
            return Ok(filter_by_time(response, &params));
        }
        Ok(response)
    }
}

/// Apply `listtransactions`' `[start, end]` window to a canned list.
fn filter_by_time(response: Value, params: &[Value]) -> Value {
    let (Some(start), Some(end)) = (
        params.first().and_then(Value::as_i64),
        params.get(1).and_then(Value::as_i64),
    ) else {
        return response;
    };
    match response {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|tx| {
                    let time = tx.get("time").and_then(Value::as_i64).unwrap_or(0);
                    time >= start && time <= end
                })
                .collect(),
        ),
        other => other,
    }
}

/// Connector handing out one [`FakeTransport`] per daemon port.
#[derive(Default)]
pub struct FakeConnector {
    transports: Mutex<HashMap<u16, Arc<FakeTransport>>>,
}

impl FakeConnector {
    /// The transport used for `port`, created on first use.
    pub fn transport(&self, port: u16) -> Arc<FakeTransport> {
        self.transports
            .lock()
            .entry(port)
            .or_insert_with(|| Arc::new(FakeTransport::new()))
            .clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, endpoint: &RpcEndpoint) -> Result<Arc<dyn RpcTransport>, RpcError> {
        Ok(self.transport(endpoint.port))
    }
}
