//! Wallet-manager constants. Fee values are in base units (1 coin = `unit_scale` units).

/// Base units per coin for bitcoin-derived chains.
pub const DEFAULT_UNIT_SCALE: u64 = 100_000_000;

/// Default fee rate in base units per estimated byte.
pub const DEFAULT_FEE_PER_BYTE: u64 = 20;

/// Default fee floor in base units.
pub const DEFAULT_MIN_TX_FEE: u64 = 10_000;

/// Change below this many base units is folded into the fee.
pub const DUST_THRESHOLD_UNITS: u64 = 546;

/// Fixed per-transaction overhead used by the size estimate.
pub const TX_OVERHEAD_BYTES: u64 = 10;

/// Estimated size of one signed P2PKH input.
pub const TX_INPUT_BYTES: u64 = 148;

/// Estimated size of one P2PKH output.
pub const TX_OUTPUT_BYTES: u64 = 34;

/// Default freshness window for the cached address list, in seconds.
pub const DEFAULT_ADDRESS_EXPIRY_SECS: i64 = 300;

/// Default freshness window for the cached UTXO list, in seconds.
pub const DEFAULT_UTXO_EXPIRY_SECS: i64 = 60;

/// Minimum spacing between transaction-history refreshes, in seconds.
pub const TX_FETCH_INTERVAL_SECS: i64 = 30;

/// Default RPC host when a wallet config omits one.
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";

/// Fiat and crypto codes priced against each coin by default.
pub const DEFAULT_CURRENCIES: &[&str] = &["BTC", "EUR", "GBP", "USD"];

/// Keys under which the manager persists state.
pub mod storage_keys {
    /// Map of ticker -> `Balance`.
    pub const BALANCES: &str = "BALANCES";
    /// Map of ticker -> {currency -> multiplier}.
    pub const ALT_CURRENCY_MULTIPLIERS: &str = "ALT_CURRENCY_MULTIPLIERS";
    /// Prefix of the per-wallet transaction history key.
    pub const TRANSACTIONS: &str = "TRANSACTIONS";
    /// Prefix of the per-wallet history fetch-time key.
    pub const TX_LAST_FETCH_TIME: &str = "TX_LAST_FETCH_TIME";

    /// Per-wallet history key, e.g. `TRANSACTIONS_BLOCK`.
    pub fn transactions(ticker: &str) -> String {
        format!("{TRANSACTIONS}_{ticker}")
    }

    /// Per-wallet history fetch-time key, e.g. `TX_LAST_FETCH_TIME_BLOCK`.
    pub fn tx_last_fetch_time(ticker: &str) -> String {
        format!("{TX_LAST_FETCH_TIME}_{ticker}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_wallet_keys_include_ticker() {
        assert_eq!(storage_keys::transactions("BLOCK"), "TRANSACTIONS_BLOCK");
        assert_eq!(
            storage_keys::tx_last_fetch_time("LTC"),
            "TX_LAST_FETCH_TIME_LTC"
        );
    }

    #[test]
    fn dust_is_below_min_fee() {
        assert!(DUST_THRESHOLD_UNITS < DEFAULT_MIN_TX_FEE);
    }
}
