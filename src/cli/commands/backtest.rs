//! Backtest command implementation.

use anyhow::{Context, Result};
use cryptor_backtest::{BacktestConfig, BacktestEngine};
use cryptor_config::AppConfig;
use cryptor_core::types::CycleRequest;
use tracing::info;

use super::load_history;
use crate::cli::BacktestArgs;

pub async fn run(args: BacktestArgs, config: AppConfig) -> Result<()> {
    info!(symbol = %args.symbol, market = %args.market, "Starting backtest");

    let bars = load_history(&args.data, &args.symbol)?;
    let backtest_config = BacktestConfig {
        initial_balance: args.balance.unwrap_or(config.backtest.initial_balance),
        ..config.backtest
    };

    let mut request = CycleRequest::new(&args.symbol, args.market);
    if let Some(leverage) = args.leverage {
        request = request.with_leverage(leverage);
    }

    let engine = BacktestEngine::new(backtest_config);
    let report = engine
        .run(config.engine, request, bars)
        .await
        .context("Backtest failed")?;

    // Output results
    match args.output.as_str() {
        "json" => println!("{}", report.to_json()?),
        _ => println!("{}", report.summary()),
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }
    if let Some(csv_path) = &args.equity_csv {
        std::fs::write(csv_path, report.equity_to_csv())
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        info!("Equity curve saved to {:?}", csv_path);
    }

    Ok(())
}
