use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tapebot")]
#[command(about = "Order-flow alerts for crypto spot markets", long_about = None)]
pub struct Cli {
    /// Config file (TOML/YAML/JSON); defaults to ./tapebot.* when present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Trading pair, e.g. BTC/USDT
    #[arg(short, long, global = true)]
    pub symbol: Option<String>,

    /// Log alerts instead of sending them to Telegram
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// tracing filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Live tape reading over the Binance websocket
    Tape,
    /// Order book imbalance from polled depth
    Obi,
    /// Cumulative volume delta from recent trades
    Cvd,
    /// Top-of-book order flow imbalance
    Ofi,
    /// Cross-exchange bid/ask spread
    Spread,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Tape => "tape",
            Command::Obi => "obi",
            Command::Cvd => "cvd",
            Command::Ofi => "ofi",
            Command::Spread => "spread",
        }
    }
}
