//! CLI definitions.

pub mod commands;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use cryptor_core::types::{Market, OptionKind};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cryptor")]
#[command(author, version, about = "Sentiment-weighted crypto trading decision engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "CRYPTOR_CONFIG")]
    pub config: PathBuf,

    /// Log level, overriding the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one evaluation cycle and print its result
    Cycle(CycleArgs),
    /// Run scheduled loops against replayed data until Ctrl-C
    Paper(PaperArgs),
    /// Replay a history through the engine
    Backtest(BacktestArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OptionType {
    Call,
    Put,
}

impl From<OptionType> for OptionKind {
    fn from(value: OptionType) -> Self {
        match value {
            OptionType::Call => OptionKind::Call,
            OptionType::Put => OptionKind::Put,
        }
    }
}

#[derive(clap::Args)]
pub struct CycleArgs {
    /// Trading pair, e.g. BTC/USDT
    #[arg(short, long)]
    pub symbol: String,

    /// Bar history (CSV file, or directory of per-symbol files)
    #[arg(long)]
    pub data: PathBuf,

    /// Market: spot, futures or option
    #[arg(short, long, default_value = "spot")]
    pub market: Market,

    /// Explicit futures leverage
    #[arg(long)]
    pub leverage: Option<u32>,

    /// Asset name for sentiment lookups
    #[arg(long)]
    pub asset: Option<String>,

    /// Quote balance of the paper account
    #[arg(long, default_value = "10000")]
    pub balance: Decimal,

    /// Option contract type (option market)
    #[arg(long, requires_all = ["strike", "expiry"])]
    pub option_type: Option<OptionType>,

    /// Option strike price
    #[arg(long)]
    pub strike: Option<Decimal>,

    /// Option expiry, RFC 3339
    #[arg(long)]
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(clap::Args)]
pub struct PaperArgs {
    /// Trading pairs (comma-separated)
    #[arg(short = 'S', long, alias = "symbol", value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Bar history (CSV file for one symbol, or directory of per-symbol files)
    #[arg(long)]
    pub data: PathBuf,

    /// Market: spot or futures
    #[arg(short, long, default_value = "spot")]
    pub market: Market,

    /// Quote balance of the paper account
    #[arg(long, default_value = "10000")]
    pub balance: Decimal,

    /// Seconds between cycles, overriding the configured cadence
    #[arg(long)]
    pub interval: Option<u64>,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Trading pair, e.g. BTC/USDT
    #[arg(short, long)]
    pub symbol: String,

    /// Bar history (CSV file, or directory of per-symbol files)
    #[arg(long)]
    pub data: PathBuf,

    /// Market: spot or futures
    #[arg(short, long, default_value = "spot")]
    pub market: Market,

    /// Explicit futures leverage
    #[arg(long)]
    pub leverage: Option<u32>,

    /// Initial quote balance, overriding the configured one
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,

    /// Save the JSON report to file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Save the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}
