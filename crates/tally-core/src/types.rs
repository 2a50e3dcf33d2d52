//! Domain types for the Tally wallet manager.
//!
//! Field names on wire-facing types follow the bitcoin-derived daemon JSON
//! (`txid`, `vout`, `scriptPubKey`, ...) so they decode straight from RPC
//! results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::constants::{
    DEFAULT_FEE_PER_BYTE, DEFAULT_MIN_TX_FEE, DEFAULT_RPC_HOST, DEFAULT_UNIT_SCALE,
    DUST_THRESHOLD_UNITS, TX_INPUT_BYTES, TX_OUTPUT_BYTES, TX_OVERHEAD_BYTES,
};

/// Ticker -> {currency code -> price multiplier}.
pub type PriceMultipliers = BTreeMap<String, BTreeMap<String, f64>>;

// ---------------------------------------------------------------------------
// Coins and wallet configuration
// ---------------------------------------------------------------------------

/// Fee and unit parameters used to fund a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Fee rate in base units per estimated byte.
    pub fee_per_byte: u64,
    /// Fee floor (or the whole fee in flat mode) in base units.
    pub min_tx_fee: u64,
    /// When set, every transaction pays exactly `min_tx_fee`.
    pub flat_fee: bool,
    /// Base units per coin.
    pub unit_scale: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            fee_per_byte: DEFAULT_FEE_PER_BYTE,
            min_tx_fee: DEFAULT_MIN_TX_FEE,
            flat_fee: false,
            unit_scale: DEFAULT_UNIT_SCALE,
        }
    }
}

impl FeePolicy {
    /// Estimated serialized size for a transaction with the given shape.
    pub fn estimate_size(inputs: usize, outputs: usize) -> u64 {
        TX_OVERHEAD_BYTES
            .saturating_add(TX_INPUT_BYTES.saturating_mul(inputs as u64))
            .saturating_add(TX_OUTPUT_BYTES.saturating_mul(outputs as u64))
    }

    /// Fee in base units for a transaction with the given shape.
    pub fn fee_units(&self, inputs: usize, outputs: usize) -> u64 {
        if self.flat_fee {
            return self.min_tx_fee;
        }
        let by_size = self
            .fee_per_byte
            .saturating_mul(Self::estimate_size(inputs, outputs));
        by_size.max(self.min_tx_fee)
    }

    /// Fee as a coin amount.
    pub fn fee(&self, inputs: usize, outputs: usize) -> Amount {
        Amount::from_units(self.fee_units(inputs, outputs), self.unit_scale)
    }

    /// Smallest change worth creating an output for.
    pub fn dust_threshold(&self) -> Amount {
        Amount::from_units(DUST_THRESHOLD_UNITS, self.unit_scale)
    }
}

/// A coin the manager knows how to handle. Loaded once from the coin manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinDescriptor {
    /// Unique key, e.g. `BLOCK`.
    pub ticker: String,
    /// Display name of the chain, e.g. `Blocknet`.
    #[serde(default, alias = "blockchain")]
    pub name: String,
    /// Base units per coin. Missing means the default scale.
    #[serde(default, alias = "coin")]
    pub unit_scale: Option<u64>,
    /// Fee floor in base units.
    #[serde(default, alias = "mintxfee")]
    pub min_tx_fee: Option<u64>,
    /// Fee rate in base units per byte.
    #[serde(default, alias = "feeperbyte")]
    pub fee_per_byte: Option<u64>,
    #[serde(default, alias = "feeflat")]
    pub flat_fee: bool,
    /// Daemon RPC port used when a wallet config carries no usable port.
    #[serde(default, alias = "rpcport")]
    pub rpc_port: Option<u16>,
}

impl CoinDescriptor {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            unit_scale: None,
            min_tx_fee: None,
            fee_per_byte: None,
            flat_fee: false,
            rpc_port: None,
        }
    }

    /// Funding parameters, with defaults filled in for anything missing.
    pub fn fee_policy(&self) -> FeePolicy {
        let defaults = FeePolicy::default();
        FeePolicy {
            fee_per_byte: self.fee_per_byte.unwrap_or(defaults.fee_per_byte),
            min_tx_fee: self.min_tx_fee.unwrap_or(defaults.min_tx_fee),
            flat_fee: self.flat_fee,
            unit_scale: self
                .unit_scale
                .filter(|s| *s > 0)
                .unwrap_or(defaults.unit_scale),
        }
    }
}

/// Resolved connection details for one daemon.
#[derive(Clone, PartialEq, Eq)]
pub struct RpcEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl RpcEndpoint {
    /// `http://host:port` URL for the JSON-RPC transport.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-coin wallet settings, as written by the external daemon configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    pub ticker: String,
    #[serde(default)]
    pub rpc_host: Option<String>,
    /// Port as configured; zero or negative means "not set".
    #[serde(default)]
    pub rpc_port: i32,
    #[serde(default)]
    pub rpc_username: String,
    #[serde(default)]
    pub rpc_password: String,
    #[serde(default)]
    pub rpc_enabled: bool,
}

impl WalletConfig {
    /// Resolve the daemon endpoint.
    ///
    /// Returns `None` when RPC is disabled or neither this config nor
    /// `fallback_port` yields a usable port.
    pub fn endpoint(&self, fallback_port: Option<u16>) -> Option<RpcEndpoint> {
        if !self.rpc_enabled {
            return None;
        }
        let port = u16::try_from(self.rpc_port)
            .ok()
            .filter(|p| *p > 0)
            .or(fallback_port.filter(|p| *p > 0))?;
        let host = self
            .rpc_host
            .clone()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_RPC_HOST.to_string());
        Some(RpcEndpoint {
            host,
            port,
            username: self.rpc_username.clone(),
            password: self.rpc_password.clone(),
        })
    }
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("ticker", &self.ticker)
            .field("rpc_host", &self.rpc_host)
            .field("rpc_port", &self.rpc_port)
            .field("rpc_username", &self.rpc_username)
            .field("rpc_password", &"<redacted>")
            .field("rpc_enabled", &self.rpc_enabled)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Chain data
// ---------------------------------------------------------------------------

/// An unspent output reported by `listunspent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub address: String,
    pub amount: Amount,
    #[serde(default, rename = "scriptPubKey")]
    pub script_pub_key: String,
    #[serde(default = "default_true")]
    pub spendable: bool,
    #[serde(default)]
    pub confirmations: i64,
}

fn default_true() -> bool {
    true
}

/// Wallet-relative direction of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxCategory {
    Receive,
    Send,
    Generate,
    Immature,
    Orphan,
    #[serde(other)]
    Other,
}

/// One entry from `listtransactions`, as kept in the persisted history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub txid: String,
    #[serde(default)]
    pub address: String,
    pub amount: Amount,
    /// Unix seconds.
    #[serde(default)]
    pub time: i64,
    #[serde(default = "default_category")]
    pub category: TxCategory,
    #[serde(default)]
    pub confirmations: i64,
}

fn default_category() -> TxCategory {
    TxCategory::Other
}

impl TransactionRecord {
    pub fn is_receive(&self) -> bool {
        self.category == TxCategory::Receive
    }
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// A payment destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
    pub amount: Amount,
    #[serde(default)]
    pub description: String,
}

impl Recipient {
    pub fn new(address: impl Into<String>, amount: Amount) -> Self {
        Self {
            address: address.into(),
            amount,
            description: String::new(),
        }
    }

    /// Non-empty address and strictly positive amount.
    pub fn is_valid(&self) -> bool {
        !self.address.trim().is_empty() && self.amount.is_positive()
    }
}

/// Outpoint reference handed to `createrawtransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: String,
    pub vout: u32,
}

/// Destination handed to `createrawtransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub amount: Amount,
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Wallet balance derived from the UTXO set, rendered to eight decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub total: String,
    pub spendable: String,
}

impl Balance {
    /// Sum all amounts for `total` and the spendable subset for `spendable`.
    pub fn from_utxos(utxos: &[Utxo]) -> Self {
        let mut total = Amount::ZERO;
        let mut spendable = Amount::ZERO;
        for utxo in utxos {
            total += utxo.amount;
            if utxo.spendable {
                spendable += utxo.amount;
            }
        }
        Self {
            total: total.to_fixed8(),
            spendable: spendable.to_fixed8(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn utxo(amount: &str, spendable: bool) -> Utxo {
        Utxo {
            txid: "aa".repeat(32),
            vout: 0,
            address: "addr".into(),
            amount: amount.parse().unwrap(),
            script_pub_key: String::new(),
            spendable,
            confirmations: 1,
        }
    }

    #[test]
    fn fee_per_byte_respects_floor() {
        let policy = FeePolicy::default();
        // 10 + 148 + 2*34 = 226 bytes * 20 = 4520 < 10_000 floor
        assert_eq!(policy.fee_units(1, 2), DEFAULT_MIN_TX_FEE);
        // 10 + 148*5 + 2*34 = 818 bytes * 20 = 16_360
        assert_eq!(policy.fee_units(5, 2), 16_360);
    }

    #[test]
    fn flat_fee_ignores_size() {
        let policy = FeePolicy {
            flat_fee: true,
            ..FeePolicy::default()
        };
        assert_eq!(policy.fee_units(1, 1), DEFAULT_MIN_TX_FEE);
        assert_eq!(policy.fee_units(50, 10), DEFAULT_MIN_TX_FEE);
    }

    #[test]
    fn fee_amount_uses_unit_scale() {
        let policy = FeePolicy {
            unit_scale: 100,
            min_tx_fee: 5,
            flat_fee: true,
            ..FeePolicy::default()
        };
        assert_eq!(policy.fee(1, 1), "0.05".parse().unwrap());
    }

    #[test]
    fn descriptor_without_fee_info_uses_defaults() {
        let coin = CoinDescriptor::new("BLOCK", "Blocknet");
        assert_eq!(coin.fee_policy(), FeePolicy::default());
    }

    #[test]
    fn descriptor_decodes_manifest_aliases() {
        let json = r#"{"ticker":"BLOCK","blockchain":"Blocknet","feeperbyte":30,"mintxfee":20000,"coin":100000000,"rpcport":41414}"#;
        let coin: CoinDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(coin.name, "Blocknet");
        let policy = coin.fee_policy();
        assert_eq!(policy.fee_per_byte, 30);
        assert_eq!(policy.min_tx_fee, 20_000);
        assert_eq!(coin.rpc_port, Some(41414));
    }

    #[test]
    fn endpoint_requires_enabled_and_port() {
        let mut conf = WalletConfig {
            ticker: "BLOCK".into(),
            rpc_host: None,
            rpc_port: 41414,
            rpc_username: "user".into(),
            rpc_password: "pass".into(),
            rpc_enabled: true,
        };
        let ep = conf.endpoint(None).unwrap();
        assert_eq!(ep.url(), "http://127.0.0.1:41414");

        conf.rpc_port = -1000;
        assert!(conf.endpoint(None).is_none());
        assert_eq!(conf.endpoint(Some(41419)).unwrap().port, 41419);

        conf.rpc_enabled = false;
        assert!(conf.endpoint(Some(41419)).is_none());
    }

    #[test]
    fn debug_redacts_password() {
        let conf = WalletConfig {
            ticker: "BLOCK".into(),
            rpc_host: None,
            rpc_port: 1,
            rpc_username: "user".into(),
            rpc_password: "hunter2".into(),
            rpc_enabled: true,
        };
        let debug = format!("{conf:?}");
        assert!(!debug.contains("hunter2"));
        let ep = format!("{:?}", conf.endpoint(None).unwrap());
        assert!(!ep.contains("hunter2"));
    }

    #[test]
    fn utxo_decodes_listunspent_entry() {
        let json = r#"{"txid":"a8f4","vout":1,"address":"yLDs","amount":15.0,"scriptPubKey":"76a9","spendable":true,"confirmations":525}"#;
        let u: Utxo = serde_json::from_str(json).unwrap();
        assert_eq!(u.vout, 1);
        assert_eq!(u.amount, "15".parse().unwrap());
        assert_eq!(u.script_pub_key, "76a9");
    }

    #[test]
    fn unknown_category_decodes_as_other() {
        let json = r#"{"txid":"t","address":"a","amount":1,"time":5,"category":"move"}"#;
        let tx: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(tx.category, TxCategory::Other);
        assert!(!tx.is_receive());
    }

    #[test]
    fn recipient_validity() {
        assert!(Recipient::new("addr", "1".parse().unwrap()).is_valid());
        assert!(!Recipient::new("", "1".parse().unwrap()).is_valid());
        assert!(!Recipient::new("addr", Amount::ZERO).is_valid());
        assert!(!Recipient::new("addr", "-1".parse().unwrap()).is_valid());
    }

    #[test]
    fn balance_splits_spendable() {
        let utxos = vec![utxo("1.1", true), utxo("2.2", false), utxo("0.00000001", true)];
        let b = Balance::from_utxos(&utxos);
        assert_eq!(b.total, "3.30000001");
        assert_eq!(b.spendable, "1.10000001");
    }

    #[test]
    fn balance_of_nothing_is_zero() {
        let b = Balance::from_utxos(&[]);
        assert_eq!(b.total, "0.00000000");
        assert_eq!(b.spendable, "0.00000000");
    }

    proptest! {
        #[test]
        fn balance_is_exact_sum(entries in proptest::collection::vec((1u64..10_000_000_000, any::<bool>()), 0..60)) {
            let utxos: Vec<Utxo> = entries
                .iter()
                .map(|(units, spendable)| Utxo {
                    amount: Amount::from_units(*units, DEFAULT_UNIT_SCALE),
                    ..utxo("0", *spendable)
                })
                .collect();
            let total_units: u64 = entries.iter().map(|(u, _)| *u).sum();
            let spendable_units: u64 = entries.iter().filter(|(_, s)| *s).map(|(u, _)| *u).sum();

            let b = Balance::from_utxos(&utxos);
            let expect_total = Decimal::new(total_units as i64, 8);
            let expect_spendable = Decimal::new(spendable_units as i64, 8);
            prop_assert_eq!(b.total, expect_total.to_string());
            prop_assert_eq!(b.spendable, expect_spendable.to_string());
        }
    }
}
