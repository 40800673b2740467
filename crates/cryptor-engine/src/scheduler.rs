//! Periodic per-symbol loops.
//!
//! Each symbol runs in its own task: run a cycle, report it on the event
//! channel, then wait for the next cadence tick or a stop request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cryptor_core::error::{CycleError, EngineError};
use cryptor_core::types::{CycleRequest, CycleResult, Market};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cycle::Engine;

/// Loop cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Wait after a completed cycle
    pub cycle_interval_secs: u64,
    /// Wait after a failed cycle
    pub retry_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: 3600,
            retry_interval_secs: 60,
        }
    }
}

impl ScheduleConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// Reported by running loops.
#[derive(Debug, Clone)]
pub enum CycleEvent {
    Completed(CycleResult),
    Failed {
        symbol: String,
        market: Market,
        error: CycleError,
    },
    Stopped {
        symbol: String,
    },
}

struct LoopHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Starts and stops independent cycle loops, at most one per symbol.
pub struct Scheduler {
    engine: Arc<Engine>,
    schedule: ScheduleConfig,
    events: mpsc::Sender<CycleEvent>,
    loops: Mutex<HashMap<String, LoopHandle>>,
}

impl Scheduler {
    /// Create a scheduler and the receiving end of its event channel.
    pub fn new(engine: Arc<Engine>, schedule: ScheduleConfig) -> (Self, mpsc::Receiver<CycleEvent>) {
        let (events, rx) = mpsc::channel(256);
        (
            Self {
                engine,
                schedule,
                events,
                loops: Mutex::new(HashMap::new()),
            },
            rx,
        )
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Start a loop for the request's symbol.
    pub async fn start(&self, request: CycleRequest) -> Result<(), EngineError> {
        request
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let mut loops = self.loops.lock().await;
        if let Some(existing) = loops.get(&request.symbol) {
            if !existing.task.is_finished() {
                return Err(EngineError::AlreadyRunning(request.symbol.clone()));
            }
        }

        let (stop, stop_rx) = watch::channel(false);
        let symbol = request.symbol.clone();
        info!(symbol = %symbol, market = %request.market, "Starting cycle loop");
        let task = tokio::spawn(run_loop(
            self.engine.clone(),
            request,
            self.schedule.clone(),
            self.events.clone(),
            stop_rx,
        ));
        loops.insert(symbol, LoopHandle { stop, task });
        Ok(())
    }

    /// Stop the loop for `symbol` and wait for it to finish.
    pub async fn stop(&self, symbol: &str) -> Result<(), EngineError> {
        let handle = self
            .loops
            .lock()
            .await
            .remove(symbol)
            .ok_or_else(|| EngineError::NotRunning(symbol.to_string()))?;
        let _ = handle.stop.send(true);
        handle
            .task
            .await
            .map_err(|e| EngineError::Task(e.to_string()))
    }

    /// Symbols with a live loop.
    pub async fn running(&self) -> Vec<String> {
        let loops = self.loops.lock().await;
        let mut symbols: Vec<_> = loops
            .iter()
            .filter(|(_, handle)| !handle.task.is_finished())
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    /// Stop every loop and wait for all of them.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.loops.lock().await.drain().map(|(_, h)| h).collect();
        info!(loops = handles.len(), "Stopping cycle loops");
        for handle in &handles {
            let _ = handle.stop.send(true);
        }
        for result in join_all(handles.into_iter().map(|h| h.task)).await {
            if let Err(e) = result {
                error!(error = %e, "Cycle loop ended abnormally");
            }
        }
    }
}

async fn run_loop(
    engine: Arc<Engine>,
    request: CycleRequest,
    schedule: ScheduleConfig,
    events: mpsc::Sender<CycleEvent>,
    mut stop: watch::Receiver<bool>,
) {
    let symbol = request.symbol.clone();
    loop {
        let (event, wait) = match engine.run_cycle(&request).await {
            Ok(result) => (CycleEvent::Completed(result), schedule.cycle_interval()),
            Err(e) => {
                error!(symbol = %symbol, market = %request.market, error = %e, "Cycle failed");
                (
                    CycleEvent::Failed {
                        symbol: symbol.clone(),
                        market: request.market,
                        error: e,
                    },
                    schedule.retry_interval(),
                )
            }
        };
        if events.send(event).await.is_err() {
            debug!(symbol = %symbol, "Event receiver gone");
        }

        let sender_gone = tokio::select! {
            _ = tokio::time::sleep(wait) => false,
            changed = stop.changed() => changed.is_err(),
        };
        if sender_gone || *stop.borrow() {
            break;
        }
    }

    info!(symbol = %symbol, "Cycle loop stopped");
    let _ = events.send(CycleEvent::Stopped { symbol }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::EnginePorts;
    use crate::EngineConfig;
    use cryptor_broker::PaperExchange;
    use cryptor_core::traits::NoTexts;
    use cryptor_core::types::Bar;
    use cryptor_data::{Advance, ReplayFeed};
    use cryptor_strategy::{LexiconScorer, LinearTrendForecaster, SentimentConfig, SentimentTracker};
    use rust_decimal_macros::dec;

    fn engine(feed: Arc<ReplayFeed>) -> Arc<Engine> {
        let ports = EnginePorts {
            market_data: feed,
            exchange: Arc::new(PaperExchange::new("USDT", dec!(1000))),
            texts: Arc::new(NoTexts),
            sentiment: Arc::new(SentimentTracker::new(LexiconScorer::default(), SentimentConfig::default())),
            forecaster: Arc::new(LinearTrendForecaster::default()),
        };
        Arc::new(Engine::new(EngineConfig::default(), ports).unwrap())
    }

    fn feed(symbols: &[&str]) -> Arc<ReplayFeed> {
        let feed = Arc::new(ReplayFeed::new(Advance::Manual));
        for symbol in symbols {
            let bars = (0..80)
                .map(|i| {
                    let close = 100.0 + (i as f64 * 0.3).sin();
                    Bar::new(i * 3_600_000, close, close + 0.5, close - 0.5, close, 5.0)
                })
                .collect();
            feed.insert(*symbol, bars, 80);
        }
        feed
    }

    fn scheduler(feed: Arc<ReplayFeed>) -> (Scheduler, mpsc::Receiver<CycleEvent>) {
        Scheduler::new(engine(feed), ScheduleConfig::default())
    }

    #[tokio::test]
    async fn test_loop_reports_then_stops() {
        let (scheduler, mut events) = scheduler(feed(&["BTC/USDT"]));
        scheduler.start(CycleRequest::new("BTC/USDT", Market::Spot)).await.unwrap();

        match events.recv().await.unwrap() {
            CycleEvent::Completed(result) => assert_eq!(result.symbol, "BTC/USDT"),
            other => panic!("unexpected event {:?}", other),
        }

        // the hour-long wait is interrupted
        tokio::time::timeout(Duration::from_secs(5), scheduler.stop("BTC/USDT"))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(events.recv().await.unwrap(), CycleEvent::Stopped { .. }));
        assert!(scheduler.running().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_loop_for_symbol_refused() {
        let (scheduler, _events) = scheduler(feed(&["BTC/USDT", "ETH/USDT"]));
        scheduler.start(CycleRequest::new("BTC/USDT", Market::Spot)).await.unwrap();

        let err = scheduler
            .start(CycleRequest::new("BTC/USDT", Market::Futures))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRunning(_)));

        scheduler.start(CycleRequest::new("ETH/USDT", Market::Spot)).await.unwrap();
        assert_eq!(scheduler.running().await, vec!["BTC/USDT", "ETH/USDT"]);

        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
            .await
            .unwrap();
        assert!(scheduler.running().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_cycle_reported() {
        let (scheduler, mut events) = scheduler(feed(&[]));
        scheduler.start(CycleRequest::new("SOL/USDT", Market::Spot)).await.unwrap();

        match events.recv().await.unwrap() {
            CycleEvent::Failed { symbol, error, .. } => {
                assert_eq!(symbol, "SOL/USDT");
                assert!(matches!(error, CycleError::DataUnavailable(_)));
            }
            other => panic!("unexpected event {:?}", other),
        }
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_unknown_symbol() {
        let (scheduler, _events) = scheduler(feed(&[]));
        assert!(matches!(scheduler.stop("BTC/USDT").await, Err(EngineError::NotRunning(_))));
        assert!(matches!(
            scheduler.start(CycleRequest::new("BTCUSDT", Market::Spot)).await,
            Err(EngineError::Config(_))
        ));
    }
}
