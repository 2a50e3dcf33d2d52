//! Shared fixtures for the integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use tally_core::traits::{KeyValueStore, ManualClock};
use tally_core::types::{CoinDescriptor, WalletConfig};
use tally_manager::error::PriceError;
use tally_manager::{MemoryStore, PriceFetcher, WalletController};
use tally_rpc::testing::FakeConnector;

/// Clock start used by every fixture; later than all scripted transactions.
pub const START_TIME: i64 = 1_596_660_000;

pub const BLOCK_PORT: u16 = 41414;
pub const LTC_PORT: u16 = 9332;
pub const BTC_PORT: u16 = 8332;

/// BLOCK, LTC and BTC descriptors. BLOCK pays a flat fee.
pub fn coins() -> Vec<CoinDescriptor> {
    let mut block = CoinDescriptor::new("BLOCK", "Blocknet");
    block.rpc_port = Some(BLOCK_PORT);
    block.flat_fee = true;
    block.min_tx_fee = Some(10_000);

    let mut ltc = CoinDescriptor::new("LTC", "Litecoin");
    ltc.fee_per_byte = Some(40);

    let btc = CoinDescriptor::new("BTC", "Bitcoin");
    vec![block, ltc, btc]
}

pub fn wallet_conf(ticker: &str, port: i32, enabled: bool) -> WalletConfig {
    WalletConfig {
        ticker: ticker.to_string(),
        rpc_host: Some("127.0.0.1".to_string()),
        rpc_port: port,
        rpc_username: format!("{}-user", ticker.to_lowercase()),
        rpc_password: "s3cret".to_string(),
        rpc_enabled: enabled,
    }
}

/// BLOCK (port from its descriptor), LTC enabled, BTC disabled, and an
/// unknown DOGE config.
pub fn wallet_confs() -> Vec<WalletConfig> {
    vec![
        wallet_conf("BLOCK", 0, true),
        wallet_conf("LTC", i32::from(LTC_PORT), true),
        wallet_conf("BTC", i32::from(BTC_PORT), false),
        wallet_conf("DOGE", 22555, true),
    ]
}

/// A loaded controller with its fakes.
pub struct Fixture {
    pub connector: Arc<FakeConnector>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<ManualClock>,
    pub controller: WalletController,
}

/// Controller over `store` with the standard coins and configs.
pub fn fixture_with_store(store: Arc<dyn KeyValueStore>) -> Fixture {
    let connector = Arc::new(FakeConnector::default());
    let clock = Arc::new(ManualClock::new(START_TIME));
    let mut controller =
        WalletController::new(coins(), wallet_confs(), store.clone(), connector.clone())
            .with_clock(clock.clone());
    controller.load_wallets();
    Fixture {
        connector,
        store,
        clock,
        controller,
    }
}

pub fn fixture() -> Fixture {
    fixture_with_store(Arc::new(MemoryStore::new()))
}

/// Price source answering a fixed price per ticker; tickers without one fail.
pub struct FixedPrices(pub BTreeMap<String, f64>);

impl FixedPrices {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self(prices.iter().map(|(t, p)| (t.to_string(), *p)).collect())
    }
}

#[async_trait]
impl PriceFetcher for FixedPrices {
    async fn fetch_prices(
        &self,
        ticker: &str,
        currencies: &[String],
    ) -> Result<BTreeMap<String, f64>, PriceError> {
        let price = self
            .0
            .get(ticker)
            .ok_or_else(|| PriceError::Api(format!("no data for {ticker}")))?;
        Ok(currencies.iter().map(|c| (c.clone(), *price)).collect())
    }
}
