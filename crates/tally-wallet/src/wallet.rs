//! High-level wallet over one coin daemon.
//!
//! Read accessors favor availability: on RPC failure they log and serve the
//! last good (or empty) value. `get_transactions` is the exception and
//! propagates. `send` is fail-fast and yields `None` on any failed step.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use tally_core::constants::{DEFAULT_ADDRESS_EXPIRY_SECS, TX_FETCH_INTERVAL_SECS};
use tally_core::traits::{Clock, KeyValueStore, SystemClock};
use tally_core::types::{
    Balance, CoinDescriptor, FeePolicy, Recipient, TransactionRecord, Utxo, WalletConfig,
};
use tally_rpc::{Connector, RpcBinding, RpcClient};

use crate::builder::TransactionBuilder;
use crate::cache::Cached;
use crate::error::WalletError;
use crate::history::{TransactionHistory, normalize_range};

/// Transaction pages are served under `<base>/<ticker lowercase>/`.
pub const EXPLORER_BASE_URL: &str = "https://chainz.cryptoid.info";

/// Outward description of a wallet. Carries no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletView {
    pub ticker: String,
    pub name: String,
    pub rpc_enabled: bool,
    pub fee_policy: FeePolicy,
}

/// One coin's wallet: daemon binding, cached state and persisted history.
pub struct Wallet {
    coin: CoinDescriptor,
    conf: WalletConfig,
    rpc: RpcBinding,
    clock: Arc<dyn Clock>,
    addresses: Cached<Vec<String>>,
    utxos: Cached<Vec<Utxo>>,
    history: TransactionHistory,
}

impl Wallet {
    pub fn new(
        coin: CoinDescriptor,
        conf: WalletConfig,
        rpc: RpcBinding,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let history = TransactionHistory::new(coin.ticker.clone(), store);
        Self {
            coin,
            conf,
            rpc,
            clock: Arc::new(SystemClock),
            addresses: Cached::default(),
            utxos: Cached::default(),
            history,
        }
    }

    /// Build a wallet, resolving the daemon endpoint through `connector`.
    ///
    /// A config without a usable port falls back to the coin's default RPC port.
    pub fn connect(
        coin: CoinDescriptor,
        conf: WalletConfig,
        connector: &dyn Connector,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let rpc = RpcBinding::from_config(&conf, coin.rpc_port, connector);
        Self::new(coin, conf, rpc, store)
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ticker(&self) -> &str {
        &self.coin.ticker
    }

    /// Display name of the chain, or the ticker when the coin has none.
    pub fn blockchain(&self) -> &str {
        if self.coin.name.is_empty() {
            &self.coin.ticker
        } else {
            &self.coin.name
        }
    }

    pub fn coin(&self) -> &CoinDescriptor {
        &self.coin
    }

    pub fn config(&self) -> &WalletConfig {
        &self.conf
    }

    pub fn view(&self) -> WalletView {
        WalletView {
            ticker: self.coin.ticker.clone(),
            name: self.blockchain().to_string(),
            rpc_enabled: self.rpc_enabled(),
            fee_policy: self.coin.fee_policy(),
        }
    }

    /// Config enables RPC and a daemon client is wired.
    pub fn rpc_enabled(&self) -> bool {
        self.conf.rpc_enabled && self.rpc.is_connected()
    }

    fn client(&self) -> Option<RpcClient> {
        if !self.conf.rpc_enabled {
            return None;
        }
        self.rpc.client().cloned()
    }

    /// RPC enabled and the daemon answers `getinfo`.
    pub async fn rpc_ready(&self) -> bool {
        let Some(client) = self.client() else {
            return false;
        };
        match client.get_info().await {
            Ok(info) => {
                debug!(ticker = %self.ticker(), blocks = ?info.blocks, "daemon ready");
                true
            }
            Err(e) => {
                debug!(ticker = %self.ticker(), error = %e, "daemon not ready");
                false
            }
        }
    }

    /// Total and spendable balance from a fresh UTXO listing.
    ///
    /// The listing also refreshes the UTXO cache, so a following
    /// `get_cached_unspent` within its expiry makes no daemon call.
    /// Returns `None` when RPC is disabled or the listing fails.
    pub async fn get_balance(&mut self) -> Option<Balance> {
        let Some(client) = self.client() else {
            error!(ticker = %self.ticker(), "failed to get balance: rpc disabled");
            return None;
        };
        match client.list_unspent().await {
            Ok(utxos) => {
                let balance = Balance::from_utxos(&utxos);
                self.utxos.store(utxos, self.clock.now());
                Some(balance)
            }
            Err(e) => {
                error!(ticker = %self.ticker(), error = %e, "failed to list utxos");
                None
            }
        }
    }

    /// Wallet addresses, refetched when the cache is older than `expiry_secs`.
    pub async fn get_addresses(&mut self, expiry_secs: i64) -> Vec<String> {
        let now = self.clock.now();
        if self.addresses.is_fresh(now, expiry_secs) {
            return self.addresses.get().clone();
        }
        let Some(client) = self.client() else {
            error!(ticker = %self.ticker(), "failed to get addresses: rpc disabled");
            return self.addresses.get().clone();
        };
        match client.get_addresses_by_account().await {
            Ok(addresses) => self.addresses.store(addresses, now),
            Err(e) => error!(ticker = %self.ticker(), error = %e, "failed to get addresses"),
        }
        self.addresses.get().clone()
    }

    /// Ask the daemon for a new address. Empty string on failure.
    pub async fn generate_new_address(&mut self) -> String {
        let Some(client) = self.client() else {
            error!(ticker = %self.ticker(), "failed to generate address: rpc disabled");
            return String::new();
        };
        self.addresses.invalidate();
        match client.get_new_address().await {
            Ok(address) => {
                info!(ticker = %self.ticker(), %address, "generated address");
                address
            }
            Err(e) => {
                error!(ticker = %self.ticker(), error = %e, "failed to generate address");
                String::new()
            }
        }
    }

    /// UTXOs, refetched when the cache is older than `expiry_secs`.
    pub async fn get_cached_unspent(&mut self, expiry_secs: i64) -> Vec<Utxo> {
        let now = self.clock.now();
        if self.utxos.is_fresh(now, expiry_secs) {
            return self.utxos.get().clone();
        }
        let Some(client) = self.client() else {
            error!(ticker = %self.ticker(), "failed to get utxos: rpc disabled");
            return self.utxos.get().clone();
        };
        match client.list_unspent().await {
            Ok(utxos) => self.utxos.store(utxos, now),
            Err(e) => error!(ticker = %self.ticker(), error = %e, "failed to list utxos"),
        }
        self.utxos.get().clone()
    }

    /// Daemon transactions in `[start_time, end_time]`.
    ///
    /// Receives to addresses outside this wallet are dropped. `end_time == 0`
    /// means now; an end before the start queries `[start, start]`. Fails
    /// rather than filter against an address list the daemon never returned.
    pub async fn get_transactions(
        &mut self,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        let Some(client) = self.client() else {
            error!(ticker = %self.ticker(), "failed to get transactions: rpc disabled");
            return Err(WalletError::Disabled(self.ticker().to_string()));
        };
        let (start, end) = normalize_range(start_time, end_time, self.clock.now());

        let own = self.own_addresses(&client).await?;
        let txs = client.list_transactions(start, end).await.inspect_err(|e| {
            error!(ticker = %self.ticker(), error = %e, "failed to list transactions");
        })?;

        Ok(txs
            .into_iter()
            .filter(|tx| !tx.is_receive() || own.contains(&tx.address))
            .collect())
    }

    /// Addresses used to filter receives. Fails when the daemon cannot list
    /// them and no earlier listing exists to fall back on.
    async fn own_addresses(&mut self, client: &RpcClient) -> Result<Vec<String>, WalletError> {
        let now = self.clock.now();
        if self.addresses.is_fresh(now, DEFAULT_ADDRESS_EXPIRY_SECS) {
            return Ok(self.addresses.get().clone());
        }
        match client.get_addresses_by_account().await {
            Ok(addresses) => self.addresses.store(addresses, now),
            Err(e) if self.addresses.is_populated() => {
                warn!(ticker = %self.ticker(), error = %e, "filtering with stale addresses");
            }
            Err(e) => {
                error!(ticker = %self.ticker(), error = %e, "failed to get addresses");
                return Err(e.into());
            }
        }
        Ok(self.addresses.get().clone())
    }

    /// Pull history since the last fetch into storage.
    ///
    /// Returns `false` when the last fetch is too recent, RPC is disabled,
    /// or the daemon call fails.
    pub async fn update_transactions(&mut self) -> bool {
        if !self.needs_transaction_update() || !self.rpc_enabled() {
            return false;
        }
        let now = self.clock.now();
        let since = self.history.last_fetch_time();
        match self.get_transactions(since, now).await {
            Ok(txs) => match self.store_fetched(&txs, now) {
                Ok(()) => true,
                Err(e) => {
                    error!(ticker = %self.ticker(), error = %e, "failed to store transactions");
                    false
                }
            },
            Err(_) => false,
        }
    }

    /// History in `[start_time, end_time]`, refreshed from the daemon when
    /// the window reaches past the last fetch. Never fails: on RPC trouble the
    /// stored history is served.
    ///
    /// The fetch time only advances when the window starts at or before the
    /// previous fetch, so `update_transactions` still covers any gap.
    pub async fn fetch_transactions(
        &mut self,
        start_time: i64,
        end_time: i64,
    ) -> Vec<TransactionRecord> {
        let now = self.clock.now();
        let (start, end) = normalize_range(start_time, end_time, now);

        if !self.rpc_enabled() || end < self.history.last_fetch_time() {
            return self.history.in_range(start, end);
        }

        let last_fetch = self.history.last_fetch_time();
        match self.get_transactions(start, end).await {
            Ok(txs) => {
                let fetched_at = if start <= last_fetch { end.min(now) } else { last_fetch };
                if let Err(e) = self.store_fetched(&txs, fetched_at) {
                    error!(ticker = %self.ticker(), error = %e, "failed to store transactions");
                }
            }
            Err(e) => {
                debug!(ticker = %self.ticker(), error = %e, "serving stored transactions");
            }
        }
        self.history.in_range(start, end)
    }

    /// Stored history in `[start_time, end_time]` without touching the daemon.
    pub fn stored_transactions(&self, start_time: i64, end_time: i64) -> Vec<TransactionRecord> {
        let (start, end) = normalize_range(start_time, end_time, self.clock.now());
        self.history.in_range(start, end)
    }

    /// Merge records into stored history. `false` if nothing was supplied
    /// or the store rejected the write.
    pub fn add_transactions(&self, records: &[TransactionRecord]) -> bool {
        match self.history.add(records) {
            Ok(added) => added,
            Err(e) => {
                error!(ticker = %self.ticker(), error = %e, "failed to store transactions");
                false
            }
        }
    }

    /// Block explorer page for `txid`.
    pub fn explorer_link(&self, txid: &str) -> String {
        format!(
            "{EXPLORER_BASE_URL}/{}/tx.dws?{txid}.htm",
            self.ticker().to_lowercase()
        )
    }

    /// Unix time of the last history fetch; zero if never fetched.
    pub fn last_transaction_fetch_time(&self) -> i64 {
        self.history.last_fetch_time()
    }

    fn needs_transaction_update(&self) -> bool {
        self.clock.now() - self.history.last_fetch_time() >= TX_FETCH_INTERVAL_SECS
    }

    fn store_fetched(&self, txs: &[TransactionRecord], fetched_at: i64) -> Result<(), WalletError> {
        self.history.add(txs)?;
        if fetched_at > self.history.last_fetch_time() {
            self.history.set_last_fetch_time(fetched_at)?;
        }
        Ok(())
    }

    /// Fund, sign and broadcast a payment. Returns the txid, or `None` if
    /// any step failed.
    pub async fn send(&mut self, recipients: &[Recipient]) -> Option<String> {
        match self.try_send(recipients).await {
            Ok(txid) => {
                info!(ticker = %self.ticker(), %txid, "sent transaction");
                self.utxos.invalidate();
                Some(txid)
            }
            Err(e) => {
                error!(ticker = %self.ticker(), error = %e, "send failed");
                None
            }
        }
    }

    async fn try_send(&self, recipients: &[Recipient]) -> Result<String, WalletError> {
        let Some(client) = self.client() else {
            return Err(WalletError::Disabled(self.ticker().to_string()));
        };
        if recipients.is_empty() {
            return Err(WalletError::Validation("no recipients".into()));
        }
        if let Some(bad) = recipients.iter().find(|r| !r.is_valid()) {
            return Err(WalletError::Validation(format!(
                "bad recipient {} amount {}",
                bad.address, bad.amount
            )));
        }

        let unspent = client.list_unspent().await.inspect_err(|e| {
            error!(ticker = %self.ticker(), error = %e, "failed to list utxos for send");
        })?;

        let mut builder = TransactionBuilder::new(self.coin.fee_policy());
        for r in recipients {
            builder.add_recipient(r.clone());
        }
        builder.fund_transaction(&unspent, None).inspect_err(|e| {
            error!(ticker = %self.ticker(), error = %e, "failed to fund transaction");
        })?;
        if !builder.is_valid() {
            return Err(WalletError::InvalidTransaction(
                "inputs do not cover outputs and fee".into(),
            ));
        }

        let raw = client
            .create_raw_transaction(&builder.get_inputs(), builder.get_tx_outputs())
            .await
            .inspect_err(|e| {
                error!(ticker = %self.ticker(), error = %e, "failed to create raw transaction");
            })?;
        let signed = client.sign_raw_transaction(&raw).await.inspect_err(|e| {
            error!(ticker = %self.ticker(), error = %e, raw_tx = %raw, "failed to sign raw transaction");
        })?;
        let txid = client.send_raw_transaction(&signed).await.inspect_err(|e| {
            error!(ticker = %self.ticker(), error = %e, "failed to broadcast transaction");
        })?;
        Ok(txid)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("ticker", &self.coin.ticker)
            .field("conf", &self.conf)
            .field("rpc_enabled", &self.rpc_enabled())
            .finish_non_exhaustive()
    }
}
