//! tally: command-line front end for the multi-coin wallet manager.
//!
//! Loads the coin manifest and wallet configs from the data directory,
//! wires each wallet to its daemon, and runs one operation per invocation.
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use tally_core::amount::Amount;
use tally_core::types::Recipient;
use tally_manager::config::{load_coins, load_wallet_configs};
use tally_manager::{CryptoCompareFetcher, JsonFileStore, ManagerConfig, WalletController};
use tally_rpc::HttpConnector;
use tally_wallet::Wallet;

/// Multi-coin wallet manager over per-coin wallet daemons.
#[derive(Parser, Debug)]
#[command(name = "tally", version)]
struct Cli {
    /// Data directory holding tally.toml, coins.json, wallets.json and the store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json"); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List loaded wallets.
    Wallets,
    /// Show persisted balances, refreshing them first with --refresh.
    Balances(RefreshArgs),
    /// Show persisted price multipliers, refreshing them first with --refresh.
    Prices(RefreshArgs),
    /// Check whether a wallet's daemon answers.
    Ready(TickerArgs),
    /// List a wallet's addresses.
    Addresses(TickerArgs),
    /// Generate a new receive address.
    NewAddress(TickerArgs),
    /// List a wallet's unspent outputs.
    Unspent(TickerArgs),
    /// Show transaction history.
    History(HistoryArgs),
    /// Send coins.
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct RefreshArgs {
    /// Query the daemons (or price API) before printing
    #[arg(long)]
    refresh: bool,
}

#[derive(Args, Debug)]
struct TickerArgs {
    /// Coin ticker, e.g. BLOCK
    ticker: String,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    /// Coin ticker, e.g. BLOCK
    ticker: String,

    /// Window start (Unix seconds)
    #[arg(long, default_value_t = 0)]
    start: i64,

    /// Window end (Unix seconds); 0 means now
    #[arg(long, default_value_t = 0)]
    end: i64,

    /// Pull new transactions from the daemon first
    #[arg(long)]
    refresh: bool,
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Coin ticker, e.g. BLOCK
    ticker: String,

    /// Recipient as ADDRESS:AMOUNT; repeat for several recipients
    #[arg(long = "to", required = true, value_parser = parse_recipient)]
    recipients: Vec<Recipient>,
}

fn parse_recipient(s: &str) -> Result<Recipient, String> {
    let (address, amount) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ADDRESS:AMOUNT, got '{s}'"))?;
    let amount: Amount = amount
        .parse()
        .map_err(|e| format!("bad amount '{amount}': {e}"))?;
    Ok(Recipient::new(address, amount))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ManagerConfig::load(cli.data_dir.clone()).context("Failed to load settings")?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    init_logging(&config.log_level, &config.log_format);

    info!(data_dir = %config.data_dir.display(), "tally v{}", env!("CARGO_PKG_VERSION"));

    let mut controller = build_controller(&config)?;

    match cli.command {
        Commands::Wallets => print_json(&controller.wallet_views()),
        Commands::Balances(args) => {
            if args.refresh {
                controller
                    .update_all_balances()
                    .await
                    .context("Failed to persist balances")?;
            }
            print_json(&controller.balances())
        }
        Commands::Prices(args) => {
            if args.refresh {
                let fetcher = CryptoCompareFetcher::new(
                    config.price_api_url.clone(),
                    Duration::from_secs(config.rpc_timeout_secs.max(1) as u64),
                )?;
                controller
                    .update_price_multipliers(&fetcher)
                    .await
                    .context("Failed to persist price multipliers")?;
            }
            print_json(&controller.currency_multipliers())
        }
        Commands::Ready(args) => {
            let wallet = wallet_mut(&mut controller, &args.ticker)?;
            print_json(&wallet.rpc_ready().await)
        }
        Commands::Addresses(args) => {
            let wallet = wallet_mut(&mut controller, &args.ticker)?;
            print_json(&wallet.get_addresses(config.address_expiry_secs).await)
        }
        Commands::NewAddress(args) => {
            let wallet = wallet_mut(&mut controller, &args.ticker)?;
            let address = wallet.generate_new_address().await;
            if address.is_empty() {
                bail!("Failed to generate an address for {}", args.ticker);
            }
            println!("{address}");
            Ok(())
        }
        Commands::Unspent(args) => {
            let wallet = wallet_mut(&mut controller, &args.ticker)?;
            print_json(&wallet.get_cached_unspent(config.utxo_expiry_secs).await)
        }
        Commands::History(args) => {
            let wallet = wallet_mut(&mut controller, &args.ticker)?;
            if args.refresh {
                wallet.update_transactions().await;
            }
            print_json(&wallet.fetch_transactions(args.start, args.end).await)
        }
        Commands::Send(args) => {
            let wallet = wallet_mut(&mut controller, &args.ticker)?;
            match wallet.send(&args.recipients).await {
                Some(txid) => {
                    println!("{txid}");
                    Ok(())
                }
                None => bail!("Send failed for {} (see log for the failing step)", args.ticker),
            }
        }
    }
}

fn build_controller(config: &ManagerConfig) -> Result<WalletController> {
    let coins_path = config.coins_path();
    let coins = load_coins(&coins_path)
        .with_context(|| format!("Failed to load coin manifest {}", coins_path.display()))?;
    let wallets_path = config.wallets_path();
    let confs = load_wallet_configs(&wallets_path)
        .with_context(|| format!("Failed to load wallet configs {}", wallets_path.display()))?;

    let store = JsonFileStore::open(config.store_path()).context("Failed to open store")?;
    let connector =
        HttpConnector::new(Duration::from_secs(config.rpc_timeout_secs.max(1) as u64));

    let mut controller =
        WalletController::new(coins, confs, Arc::new(store), Arc::new(connector))
            .with_currencies(config.currencies.clone());
    controller.load_wallets();
    Ok(controller)
}

fn wallet_mut<'a>(controller: &'a mut WalletController, ticker: &str) -> Result<&'a mut Wallet> {
    controller
        .get_wallet_mut(ticker)
        .ok_or_else(|| anyhow!("No wallet loaded for {ticker}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence over `level_str`.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
