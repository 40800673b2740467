//! Paper trading command implementation.

use anyhow::{bail, Context, Result};
use cryptor_broker::PaperExchange;
use cryptor_config::AppConfig;
use cryptor_core::types::{CycleRequest, Market, SymbolPair};
use cryptor_data::{Advance, ReplayFeed};
use cryptor_engine::{CycleEvent, Engine, ScheduleConfig, Scheduler};
use cryptor_monitor::StatusBoard;
use std::sync::Arc;
use tracing::{info, warn};

use super::{load_history, paper_ports};
use crate::cli::PaperArgs;

pub async fn run(args: PaperArgs, config: AppConfig) -> Result<()> {
    if args.market == Market::Option {
        bail!("Paper loops trade spot or futures only");
    }
    let first = args.symbols.first().context("At least one symbol is required")?;
    let quote = SymbolPair::parse(first).map_err(anyhow::Error::msg)?.quote;

    // each fetch reveals one more recorded bar
    let feed = Arc::new(ReplayFeed::new(Advance::OnFetch));
    let warmup = config.engine.required_bars().saturating_sub(1);
    for symbol in &args.symbols {
        let bars = load_history(&args.data, symbol)?;
        info!(symbol = %symbol, bars = bars.len(), "Loaded history");
        feed.insert(symbol.clone(), bars, warmup);
    }

    let exchange = Arc::new(PaperExchange::new(&quote, args.balance));
    let engine = Arc::new(
        Engine::new(config.engine, paper_ports(feed, exchange, &config.sentiment))
            .context("Invalid engine configuration")?,
    );
    let schedule = match args.interval {
        Some(secs) => ScheduleConfig {
            cycle_interval_secs: secs,
            retry_interval_secs: secs,
        },
        None => config.schedule,
    };

    let (scheduler, mut events) = Scheduler::new(engine, schedule);
    for symbol in &args.symbols {
        scheduler
            .start(CycleRequest::new(symbol, args.market))
            .await
            .with_context(|| format!("Failed to start {}", symbol))?;
    }

    let board = StatusBoard::new();
    println!("Paper trading {} symbol(s). Press Ctrl-C to stop.", args.symbols.len());
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match &event {
                    CycleEvent::Completed(result) => println!("{}", serde_json::to_string(result)?),
                    CycleEvent::Failed { symbol, error, .. } => warn!(symbol = %symbol, error = %error, "Cycle failed"),
                    CycleEvent::Stopped { .. } => {}
                }
                board.apply(&event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    scheduler.shutdown().await;
    while let Ok(event) = events.try_recv() {
        board.apply(&event).await;
    }
    print!("{}", board.render().await);
    Ok(())
}
