//! Manager configuration.
//!
//! [`ManagerConfig`] is layered: built-in defaults, then `tally.toml` in the
//! data directory (optional), then `TALLY_*` environment variables. Coin
//! and wallet definitions are separate JSON files read once at startup.

use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tally_core::constants::{
    DEFAULT_ADDRESS_EXPIRY_SECS, DEFAULT_CURRENCIES, DEFAULT_UTXO_EXPIRY_SECS,
};
use tally_core::types::{CoinDescriptor, WalletConfig};

use crate::error::ConfigError;
use crate::pricing::CRYPTOCOMPARE_URL;

/// Settings file looked up in the data directory.
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Settings for the wallet manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Root directory for the store and definition files.
    pub data_dir: PathBuf,
    /// Log level filter string (e.g. "info", "tally_wallet=debug").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    /// Currency codes requested for every ticker.
    pub currencies: Vec<String>,
    pub price_api_url: String,
    pub address_expiry_secs: i64,
    pub utxo_expiry_secs: i64,
    /// Per-request daemon timeout.
    pub rpc_timeout_secs: i64,
    /// Coin manifest; defaults to `<data_dir>/coins.json`.
    pub coins_file: Option<PathBuf>,
    /// Wallet configs; defaults to `<data_dir>/wallets.json`.
    pub wallets_file: Option<PathBuf>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tally");

        Self {
            data_dir,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            currencies: DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect(),
            price_api_url: CRYPTOCOMPARE_URL.to_string(),
            address_expiry_secs: DEFAULT_ADDRESS_EXPIRY_SECS,
            utxo_expiry_secs: DEFAULT_UTXO_EXPIRY_SECS,
            rpc_timeout_secs: 20,
            coins_file: None,
            wallets_file: None,
        }
    }
}

impl ManagerConfig {
    /// Load settings rooted at `data_dir` (or the default data directory).
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut defaults = Self::default();
        if let Some(dir) = data_dir {
            defaults.data_dir = dir;
        }
        let file = defaults.data_dir.join(CONFIG_FILE_NAME);

        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", defaults.log_format)?
            .set_default("currencies", defaults.currencies)?
            .set_default("price_api_url", defaults.price_api_url)?
            .set_default("address_expiry_secs", defaults.address_expiry_secs)?
            .set_default("utxo_expiry_secs", defaults.utxo_expiry_secs)?
            .set_default("rpc_timeout_secs", defaults.rpc_timeout_secs)?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix("TALLY")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("currencies"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Path of the key-value store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    pub fn coins_path(&self) -> PathBuf {
        self.coins_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("coins.json"))
    }

    pub fn wallets_path(&self) -> PathBuf {
        self.wallets_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("wallets.json"))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read the coin manifest: a JSON array of coin descriptors.
pub fn load_coins(path: &Path) -> Result<Vec<CoinDescriptor>, ConfigError> {
    read_json(path)
}

/// Read the wallet configs: a JSON array of per-coin RPC settings.
pub fn load_wallet_configs(path: &Path) -> Result<Vec<WalletConfig>, ConfigError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_data_dir_ends_with_tally() {
        let cfg = ManagerConfig::default();
        assert!(cfg.data_dir.ends_with("tally"), "{:?}", cfg.data_dir);
    }

    #[test]
    fn default_currencies() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.currencies, vec!["BTC", "EUR", "GBP", "USD"]);
        assert_eq!(cfg.address_expiry_secs, 300);
    }

    #[test]
    fn derived_paths() {
        let cfg = ManagerConfig {
            data_dir: PathBuf::from("/tmp/tally-test"),
            ..ManagerConfig::default()
        };
        assert_eq!(cfg.store_path(), PathBuf::from("/tmp/tally-test/storage.json"));
        assert_eq!(cfg.coins_path(), PathBuf::from("/tmp/tally-test/coins.json"));

        let custom = ManagerConfig {
            wallets_file: Some(PathBuf::from("/etc/tally/wallets.json")),
            ..cfg
        };
        assert_eq!(custom.wallets_path(), PathBuf::from("/etc/tally/wallets.json"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ManagerConfig::load(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(cfg.data_dir, dir.path());
        assert_eq!(cfg.utxo_expiry_secs, 60);
    }

    #[test]
    fn load_reads_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "log_level = \"debug\"\ncurrencies = [\"USD\"]\naddress_expiry_secs = 30\n",
        )
        .unwrap();
        let cfg = ManagerConfig::load(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.currencies, vec!["USD"]);
        assert_eq!(cfg.address_expiry_secs, 30);
        assert_eq!(cfg.log_format, "text");
    }

    #[test]
    fn coin_manifest_accepts_daemon_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coins.json");
        fs::write(
            &path,
            r#"[
                {"ticker": "BLOCK", "blockchain": "Blocknet", "coin": 100000000,
                 "mintxfee": 10000, "feeperbyte": 20, "rpcport": 41414},
                {"ticker": "LTC", "name": "Litecoin"}
            ]"#,
        )
        .unwrap();
        let coins = load_coins(&path).unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].name, "Blocknet");
        assert_eq!(coins[0].rpc_port, Some(41414));
        assert_eq!(coins[1].fee_policy().min_tx_fee, 10_000);
    }

    #[test]
    fn wallet_configs_parse_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallets.json");
        fs::write(
            &path,
            r#"[{"ticker": "BLOCK", "rpcPort": 41414, "rpcUsername": "u",
                 "rpcPassword": "p", "rpcEnabled": true}]"#,
        )
        .unwrap();
        let confs = load_wallet_configs(&path).unwrap();
        assert!(confs[0].rpc_enabled);
        assert_eq!(confs[0].rpc_port, 41414);
    }

    #[test]
    fn missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(load_coins(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{").unwrap();
        assert!(matches!(
            load_wallet_configs(&bad),
            Err(ConfigError::Parse { .. })
        ));
    }
}
