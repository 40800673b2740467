//! cryptor CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use cryptor_config::{load_config, AppConfig};
use cryptor_monitor::setup_logging;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing default file falls back to built-in defaults; a broken one is an error
    let config = if cli.config.exists() {
        load_config(&cli.config)
    } else {
        Ok(AppConfig::default())
    };

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or(logging.level);
    let json = cli.json_logs || logging.format == "json";
    let _log_guard = setup_logging(&level, json, logging.file.as_deref().map(Path::new));

    // Execute command
    match cli.command {
        Commands::Cycle(args) => cli::commands::cycle::run(args, config?).await,
        Commands::Paper(args) => cli::commands::paper::run(args, config?).await,
        Commands::Backtest(args) => cli::commands::backtest::run(args, config?).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}
