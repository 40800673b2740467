//! Single cycle command implementation.

use anyhow::{Context, Result};
use cryptor_broker::PaperExchange;
use cryptor_config::AppConfig;
use cryptor_core::types::{CycleRequest, OptionParams, SymbolPair};
use cryptor_data::{Advance, ReplayFeed};
use cryptor_engine::Engine;
use std::sync::Arc;
use tracing::info;

use super::{load_history, paper_ports};
use crate::cli::CycleArgs;

pub async fn run(args: CycleArgs, config: AppConfig) -> Result<()> {
    let pair = SymbolPair::parse(&args.symbol).map_err(anyhow::Error::msg)?;
    let bars = load_history(&args.data, &args.symbol)?;
    info!(symbol = %args.symbol, market = %args.market, bars = bars.len(), "Loaded history");

    let feed = Arc::new(ReplayFeed::new(Advance::Manual));
    let visible = bars.len();
    feed.insert(args.symbol.clone(), bars, visible);
    let exchange = Arc::new(PaperExchange::new(&pair.quote, args.balance));
    let engine = Engine::new(config.engine, paper_ports(feed, exchange, &config.sentiment))
        .context("Invalid engine configuration")?;

    let mut request = CycleRequest::new(&args.symbol, args.market);
    if let Some(asset) = args.asset {
        request = request.with_asset(asset);
    }
    if let Some(leverage) = args.leverage {
        request = request.with_leverage(leverage);
    }
    if let (Some(kind), Some(strike_price), Some(expiry)) = (args.option_type, args.strike, args.expiry) {
        request = request.with_option(OptionParams {
            kind: kind.into(),
            strike_price,
            expiry,
        });
    }

    let result = engine.run_cycle(&request).await.context("Cycle aborted")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
