use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Moves funds between accounts of a shared ledger", long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Log output format (filtering follows RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct StoreConfig {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "WALLET_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// CSV file (id,balance,currency) of accounts to provision at start-up
    #[arg(long, global = true)]
    pub accounts: Option<PathBuf>,

    /// Maximum time a transfer may spend acquiring locks and staging writes
    #[arg(long, env = "WALLET_LOCK_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub lock_timeout_ms: u64,
}

impl StoreConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// HTTP listen address
        #[arg(long, env = "WALLET_HTTP_ADDR", default_value = "0.0.0.0:8080")]
        addr: SocketAddr,
    },
    /// Print all accounts as CSV
    Balances,
    /// Run a single transfer, then print all accounts as CSV
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, allow_hyphen_values = true)]
        amount: Decimal,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
