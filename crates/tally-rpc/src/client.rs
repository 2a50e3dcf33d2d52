//! Typed daemon client and the enabled/disabled binding.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value, json};
use tracing::{debug, warn};

use tally_core::error::RpcError;
use tally_core::types::{TransactionRecord, TxInput, TxOutput, Utxo, WalletConfig};

use crate::transport::{Connector, RpcTransport};
use crate::types::{DaemonInfo, SignedTransaction};

/// Daemon method names. Fixed across all supported coins.
pub mod methods {
    pub const GET_INFO: &str = "getinfo";
    pub const LIST_UNSPENT: &str = "listunspent";
    pub const LIST_TRANSACTIONS: &str = "listtransactions";
    pub const GET_ADDRESSES_BY_ACCOUNT: &str = "getaddressesbyaccount";
    pub const GET_NEW_ADDRESS: &str = "getnewaddress";
    pub const CREATE_RAW_TRANSACTION: &str = "createrawtransaction";
    pub const SIGN_RAW_TRANSACTION: &str = "signrawtransaction";
    pub const SEND_RAW_TRANSACTION: &str = "sendrawtransaction";
}

/// Typed wrapper over one daemon's transport.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, RpcError> {
        let value = self.transport.invoke(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode(format!("{method}: {e}")))
    }

    pub async fn get_info(&self) -> Result<DaemonInfo, RpcError> {
        self.call(methods::GET_INFO, vec![]).await
    }

    pub async fn list_unspent(&self) -> Result<Vec<Utxo>, RpcError> {
        self.call(methods::LIST_UNSPENT, vec![]).await
    }

    /// Wallet transactions with `start_time <= time <= end_time` (Unix seconds).
    pub async fn list_transactions(
        &self,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<TransactionRecord>, RpcError> {
        self.call(methods::LIST_TRANSACTIONS, vec![json!(start_time), json!(end_time)])
            .await
    }

    /// Addresses of the default account.
    pub async fn get_addresses_by_account(&self) -> Result<Vec<String>, RpcError> {
        self.call(methods::GET_ADDRESSES_BY_ACCOUNT, vec![json!("")])
            .await
    }

    pub async fn get_new_address(&self) -> Result<String, RpcError> {
        self.call(methods::GET_NEW_ADDRESS, vec![]).await
    }

    /// Returns the unsigned raw transaction hex.
    pub async fn create_raw_transaction(
        &self,
        inputs: &[TxInput],
        outputs: &[TxOutput],
    ) -> Result<String, RpcError> {
        let inputs = serde_json::to_value(inputs)
            .map_err(|e| RpcError::Decode(format!("createrawtransaction inputs: {e}")))?;
        self.call(
            methods::CREATE_RAW_TRANSACTION,
            vec![inputs, outputs_param(outputs)?],
        )
        .await
    }

    /// Sign with the daemon's keys. Fails if the daemon could not sign every input.
    pub async fn sign_raw_transaction(&self, raw_tx: &str) -> Result<String, RpcError> {
        let signed: SignedTransaction = self
            .call(methods::SIGN_RAW_TRANSACTION, vec![json!(raw_tx)])
            .await?;
        if !signed.complete {
            return Err(RpcError::Decode(
                "signrawtransaction: signature incomplete".into(),
            ));
        }
        Ok(signed.hex)
    }

    /// Broadcast and return the transaction id.
    pub async fn send_raw_transaction(&self, signed_tx: &str) -> Result<String, RpcError> {
        self.call(methods::SEND_RAW_TRANSACTION, vec![json!(signed_tx)])
            .await
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient").finish_non_exhaustive()
    }
}

/// `{address: amount}` object; daemons expect amounts as JSON numbers.
fn outputs_param(outputs: &[TxOutput]) -> Result<Value, RpcError> {
    let mut map = Map::new();
    for out in outputs {
        let number = Number::from_f64(out.amount.to_f64()).ok_or_else(|| {
            RpcError::Decode(format!("amount {} is not a finite number", out.amount))
        })?;
        map.insert(out.address.clone(), Value::Number(number));
    }
    Ok(Value::Object(map))
}

/// Whether a wallet has a daemon to talk to.
#[derive(Debug, Clone, Default)]
pub enum RpcBinding {
    /// No usable endpoint; no RPC call is ever attempted.
    #[default]
    Disabled,
    Connected(RpcClient),
}

impl RpcBinding {
    /// Resolve `conf` to an endpoint and connect.
    ///
    /// Disabled configs, configs with no usable port, and connector failures
    /// all yield [`RpcBinding::Disabled`].
    pub fn from_config(
        conf: &WalletConfig,
        fallback_port: Option<u16>,
        connector: &dyn Connector,
    ) -> Self {
        let Some(endpoint) = conf.endpoint(fallback_port) else {
            debug!(ticker = %conf.ticker, "rpc not configured");
            return Self::Disabled;
        };
        match connector.connect(&endpoint) {
            Ok(transport) => Self::Connected(RpcClient::new(transport)),
            Err(e) => {
                warn!(ticker = %conf.ticker, error = %e, "failed to create rpc client");
                Self::Disabled
            }
        }
    }

    pub fn client(&self) -> Option<&RpcClient> {
        match self {
            Self::Connected(client) => Some(client),
            Self::Disabled => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}
