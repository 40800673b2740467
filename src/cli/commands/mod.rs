//! CLI command implementations.

pub mod backtest;
pub mod cycle;
pub mod paper;
pub mod validate;

use anyhow::{bail, Context, Result};
use cryptor_core::types::{Bar, SymbolPair};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cryptor_broker::PaperExchange;
use cryptor_core::traits::NoTexts;
use cryptor_data::{load_bars, ReplayFeed};
use cryptor_engine::EnginePorts;
use cryptor_strategy::{LexiconScorer, LinearTrendForecaster, SentimentConfig, SentimentTracker};

/// Resolve the CSV for `symbol` from a file or a directory of per-symbol files.
pub fn history_path(data: &Path, symbol: &str) -> Result<PathBuf> {
    if !data.exists() {
        bail!(
            "Data path '{}' does not exist. Provide a CSV file or a directory of CSV files",
            data.display()
        );
    }
    if data.is_file() {
        return Ok(data.to_path_buf());
    }

    let pair = SymbolPair::parse(symbol).map_err(anyhow::Error::msg)?;
    let candidates = [
        format!("{}_{}.csv", pair.base, pair.quote),
        format!("{}{}.csv", pair.base, pair.quote),
        format!("{}_{}.csv", pair.base, pair.quote).to_lowercase(),
        format!("{}{}.csv", pair.base, pair.quote).to_lowercase(),
        format!("{}.csv", pair.base),
        format!("{}.csv", pair.base.to_lowercase()),
    ];
    candidates
        .iter()
        .map(|name| data.join(name))
        .find(|path| path.exists())
        .with_context(|| format!("No CSV for {} in {}", symbol, data.display()))
}

pub fn load_history(data: &Path, symbol: &str) -> Result<Vec<Bar>> {
    let path = history_path(data, symbol)?;
    load_bars(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Ports wired to a replay feed and a paper exchange.
pub fn paper_ports(feed: Arc<ReplayFeed>, exchange: Arc<PaperExchange>, sentiment: &SentimentConfig) -> EnginePorts {
    EnginePorts {
        market_data: feed,
        exchange,
        texts: Arc::new(NoTexts),
        sentiment: Arc::new(SentimentTracker::new(LexiconScorer::default(), sentiment.clone())),
        forecaster: Arc::new(LinearTrendForecaster::default()),
    }
}
