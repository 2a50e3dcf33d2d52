//! Wallet controller.
//!
//! Owns every [`Wallet`], runs the balance and price sweeps over the enabled
//! ones, and keeps the aggregated maps in the key-value store:
//! - `BALANCES`: ticker -> {total, spendable}
//! - `ALT_CURRENCY_MULTIPLIERS`: ticker -> {currency -> multiplier}
//!
//! Sweeps visit wallets one at a time. A failing wallet is logged and
//! skipped; it never aborts the sweep.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use tally_core::constants::{DEFAULT_CURRENCIES, storage_keys};
use tally_core::error::StorageError;
use tally_core::traits::{Clock, KeyValueStore, SystemClock};
use tally_core::types::{Balance, CoinDescriptor, PriceMultipliers, WalletConfig};
use tally_rpc::Connector;
use tally_wallet::{Wallet, WalletView};

use crate::pricing::PriceFetcher;

/// Ticker -> latest known balance.
pub type BalanceMap = BTreeMap<String, Balance>;

pub struct WalletController {
    coins: Vec<CoinDescriptor>,
    confs: Vec<WalletConfig>,
    store: Arc<dyn KeyValueStore>,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    currencies: Vec<String>,
    wallets: BTreeMap<String, Wallet>,
}

impl WalletController {
    pub fn new(
        coins: Vec<CoinDescriptor>,
        confs: Vec<WalletConfig>,
        store: Arc<dyn KeyValueStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            coins,
            confs,
            store,
            connector,
            clock: Arc::new(SystemClock),
            currencies: DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect(),
            wallets: BTreeMap::new(),
        }
    }

    /// Currency codes requested per ticker. Duplicates are dropped.
    pub fn with_currencies(mut self, currencies: Vec<String>) -> Self {
        let unique: BTreeSet<String> = currencies.into_iter().collect();
        self.currencies = unique.into_iter().collect();
        self
    }

    /// Time source handed to every wallet loaded afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    /// Build a wallet for every config whose ticker is a known coin.
    ///
    /// Unknown tickers are skipped. Returns the number of wallets loaded.
    pub fn load_wallets(&mut self) -> usize {
        self.wallets.clear();
        for conf in &self.confs {
            let Some(coin) = self.coins.iter().find(|c| c.ticker == conf.ticker) else {
                warn!(ticker = %conf.ticker, "no coin descriptor for wallet, skipping");
                continue;
            };
            if self.wallets.contains_key(&conf.ticker) {
                warn!(ticker = %conf.ticker, "duplicate wallet config, keeping the first");
                continue;
            }
            let wallet = Wallet::connect(
                coin.clone(),
                conf.clone(),
                self.connector.as_ref(),
                self.store.clone(),
            )
            .with_clock(self.clock.clone());
            debug!(ticker = %conf.ticker, rpc_enabled = wallet.rpc_enabled(), "loaded wallet");
            self.wallets.insert(conf.ticker.clone(), wallet);
        }
        info!(count = self.wallets.len(), "wallets loaded");
        self.wallets.len()
    }

    /// Every loaded wallet, by ticker.
    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    pub fn get_wallet(&self, ticker: &str) -> Option<&Wallet> {
        self.wallets.get(ticker)
    }

    pub fn get_wallet_mut(&mut self, ticker: &str) -> Option<&mut Wallet> {
        self.wallets.get_mut(ticker)
    }

    pub fn enabled_wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values().filter(|w| w.rpc_enabled())
    }

    pub fn wallet_views(&self) -> Vec<WalletView> {
        self.wallets.values().map(Wallet::view).collect()
    }

    /// Persisted balances; empty when missing or malformed.
    pub fn balances(&self) -> BalanceMap {
        self.store
            .get(storage_keys::BALANCES)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    /// Persisted price multipliers; empty when missing or malformed.
    pub fn currency_multipliers(&self) -> PriceMultipliers {
        self.store
            .get(storage_keys::ALT_CURRENCY_MULTIPLIERS)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    /// Refresh price multipliers for every enabled wallet.
    ///
    /// A ticker whose fetch fails maps to an empty entry. The finished map
    /// replaces the persisted one wholesale.
    pub async fn update_price_multipliers(
        &self,
        fetcher: &dyn PriceFetcher,
    ) -> Result<PriceMultipliers, StorageError> {
        let mut multipliers = PriceMultipliers::new();
        for wallet in self.enabled_wallets() {
            let ticker = wallet.ticker();
            let entry = match fetcher.fetch_prices(ticker, &self.currencies).await {
                Ok(prices) => prices,
                Err(e) => {
                    error!(%ticker, error = %e, "failed to update currency data");
                    BTreeMap::new()
                }
            };
            multipliers.insert(ticker.to_string(), entry);
        }

        self.store.set(
            storage_keys::ALT_CURRENCY_MULTIPLIERS,
            serde_json::to_value(&multipliers)?,
        )?;
        info!(tickers = multipliers.len(), "price multipliers updated");
        Ok(multipliers)
    }

    /// Refresh one wallet's balance. Returns whether the persisted map changed.
    pub async fn update_balance_info(&mut self, ticker: &str) -> Result<bool, StorageError> {
        let mut balances = self.balances();
        if !self.refresh_balance(ticker, &mut balances).await {
            return Ok(false);
        }
        self.save_balances(&balances)?;
        Ok(true)
    }

    /// Refresh every enabled wallet's balance, writing the map back only if
    /// at least one entry changed.
    pub async fn update_all_balances(&mut self) -> Result<bool, StorageError> {
        let mut balances = self.balances();
        let tickers: Vec<String> = self
            .enabled_wallets()
            .map(|w| w.ticker().to_string())
            .collect();

        let mut changed = false;
        for ticker in &tickers {
            if self.refresh_balance(ticker, &mut balances).await {
                changed = true;
            }
        }

        if changed {
            self.save_balances(&balances)?;
        }
        debug!(wallets = tickers.len(), changed, "balance sweep finished");
        Ok(changed)
    }

    async fn refresh_balance(&mut self, ticker: &str, balances: &mut BalanceMap) -> bool {
        let Some(wallet) = self.wallets.get_mut(ticker) else {
            warn!(%ticker, "no wallet for balance update");
            return false;
        };
        let Some(balance) = wallet.get_balance().await else {
            return false;
        };
        if balances.get(ticker) == Some(&balance) {
            return false;
        }
        balances.insert(ticker.to_string(), balance);
        true
    }

    fn save_balances(&self, balances: &BalanceMap) -> Result<(), StorageError> {
        self.store
            .set(storage_keys::BALANCES, serde_json::to_value(balances)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tally_core::error::RpcError;
    use tally_rpc::methods;
    use tally_rpc::testing::{FakeConnector, SPENDABLE_BALANCE, TOTAL_BALANCE};

    use crate::error::PriceError;
    use crate::storage::MemoryStore;

    fn coins() -> Vec<CoinDescriptor> {
        let mut block = CoinDescriptor::new("BLOCK", "Blocknet");
        block.rpc_port = Some(41414);
        vec![
            block,
            CoinDescriptor::new("LTC", "Litecoin"),
            CoinDescriptor::new("XYZ", "Xyz"),
        ]
    }

    fn conf(ticker: &str, port: i32, enabled: bool) -> WalletConfig {
        WalletConfig {
            ticker: ticker.into(),
            rpc_host: None,
            rpc_port: port,
            rpc_username: "user".into(),
            rpc_password: "pass".into(),
            rpc_enabled: enabled,
        }
    }

    fn controller(
        confs: Vec<WalletConfig>,
    ) -> (Arc<FakeConnector>, Arc<MemoryStore>, WalletController) {
        let connector = Arc::new(FakeConnector::default());
        let store = Arc::new(MemoryStore::new());
        let mut ctl = WalletController::new(coins(), confs, store.clone(), connector.clone());
        ctl.load_wallets();
        (connector, store, ctl)
    }

    fn standard() -> (Arc<FakeConnector>, Arc<MemoryStore>, WalletController) {
        controller(vec![
            conf("BLOCK", 0, true),
            conf("LTC", 9332, true),
            conf("XYZ", 9999, true),
            conf("DOGE", 22555, true),
        ])
    }

    struct ScriptedPrices;

    #[async_trait]
    impl PriceFetcher for ScriptedPrices {
        async fn fetch_prices(
            &self,
            ticker: &str,
            currencies: &[String],
        ) -> Result<BTreeMap<String, f64>, PriceError> {
            if ticker == "XYZ" {
                return Err(PriceError::Api("no data".into()));
            }
            Ok(currencies.iter().map(|c| (c.clone(), 2.0)).collect())
        }
    }

    #[test]
    fn load_skips_unknown_tickers() {
        let (_, _, ctl) = standard();
        let tickers: Vec<&str> = ctl.wallets().map(|w| w.ticker()).collect();
        assert_eq!(tickers, vec!["BLOCK", "LTC", "XYZ"]);
        assert!(ctl.get_wallet("DOGE").is_none());
    }

    #[tokio::test]
    async fn missing_port_falls_back_to_coin_default() {
        let (connector, _, mut ctl) = standard();
        assert!(ctl.get_wallet("BLOCK").unwrap().rpc_enabled());
        ctl.update_balance_info("BLOCK").await.unwrap();
        assert_eq!(
            connector.transport(41414).call_count(methods::LIST_UNSPENT),
            1
        );
    }

    #[test]
    fn enabled_wallets_filter() {
        let (_, _, ctl) = controller(vec![conf("BLOCK", 41414, true), conf("LTC", 9332, false)]);
        let enabled: Vec<&str> = ctl.enabled_wallets().map(|w| w.ticker()).collect();
        assert_eq!(enabled, vec!["BLOCK"]);
        assert_eq!(ctl.wallet_views().len(), 2);
    }

    #[test]
    fn accessors_default_to_empty() {
        let (_, store, ctl) = standard();
        assert!(ctl.balances().is_empty());
        assert!(ctl.currency_multipliers().is_empty());
        store.set(storage_keys::BALANCES, json!("corrupt")).unwrap();
        assert!(ctl.balances().is_empty());
    }

    #[test]
    fn currencies_are_deduplicated() {
        let (_, _, ctl) = standard();
        let ctl = ctl.with_currencies(vec!["USD".into(), "BTC".into(), "USD".into()]);
        assert_eq!(ctl.currencies(), ["BTC", "USD"]);
    }

    #[tokio::test]
    async fn price_sweep_isolates_failures() {
        let (_, store, ctl) = standard();
        let result = ctl.update_price_multipliers(&ScriptedPrices).await.unwrap();

        assert!(result["XYZ"].is_empty());
        assert_eq!(result["BLOCK"]["USD"], 2.0);
        assert_eq!(result["LTC"].len(), 4);
        assert!(store.get(storage_keys::ALT_CURRENCY_MULTIPLIERS).is_some());
        assert_eq!(ctl.currency_multipliers(), result);
    }

    #[tokio::test]
    async fn price_sweep_replaces_wholesale() {
        let (_, store, ctl) = standard();
        store
            .set(
                storage_keys::ALT_CURRENCY_MULTIPLIERS,
                json!({"OLD": {"USD": 1.0}}),
            )
            .unwrap();
        ctl.update_price_multipliers(&ScriptedPrices).await.unwrap();
        assert!(!ctl.currency_multipliers().contains_key("OLD"));
    }

    #[tokio::test]
    async fn price_sweep_skips_disabled_wallets() {
        let (_, _, ctl) = controller(vec![conf("BLOCK", 41414, true), conf("LTC", 9332, false)]);
        let result = ctl.update_price_multipliers(&ScriptedPrices).await.unwrap();
        assert!(result.contains_key("BLOCK"));
        assert!(!result.contains_key("LTC"));
    }

    #[tokio::test]
    async fn balance_sweep_persists_and_isolates_failures() {
        let (connector, _, mut ctl) = standard();
        connector
            .transport(9332)
            .fail(methods::LIST_UNSPENT, RpcError::Transport("down".into()));

        assert!(ctl.update_all_balances().await.unwrap());
        let balances = ctl.balances();
        assert_eq!(balances["BLOCK"].total, TOTAL_BALANCE);
        assert_eq!(balances["BLOCK"].spendable, SPENDABLE_BALANCE);
        assert!(!balances.contains_key("LTC"));
        assert!(balances.contains_key("XYZ"));
    }

    #[tokio::test]
    async fn balance_sweep_writes_only_on_change() {
        let (connector, _, mut ctl) = standard();
        assert!(ctl.update_all_balances().await.unwrap());
        assert!(!ctl.update_all_balances().await.unwrap());

        connector.transport(41414).respond(
            methods::LIST_UNSPENT,
            json!([{"txid": "aa", "vout": 0, "amount": 1.5, "spendable": true}]),
        );
        assert!(ctl.update_all_balances().await.unwrap());
        assert_eq!(ctl.balances()["BLOCK"].total, "1.50000000");
    }

    #[tokio::test]
    async fn balance_sweep_all_failing_writes_nothing() {
        let (connector, store, mut ctl) = controller(vec![conf("LTC", 9332, true)]);
        connector
            .transport(9332)
            .fail(methods::LIST_UNSPENT, RpcError::Transport("down".into()));
        assert!(!ctl.update_all_balances().await.unwrap());
        assert!(store.get(storage_keys::BALANCES).is_none());
    }

    #[tokio::test]
    async fn single_balance_update() {
        let (_, _, mut ctl) = standard();
        assert!(ctl.update_balance_info("LTC").await.unwrap());
        assert_eq!(ctl.balances().len(), 1);
        assert!(!ctl.update_balance_info("LTC").await.unwrap());
        assert!(!ctl.update_balance_info("DOGE").await.unwrap());
    }
}
