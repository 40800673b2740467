//! Latest cycle outcome per symbol.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cryptor_core::error::CycleError;
use cryptor_core::types::{CycleAction, CycleResult, Market};
use cryptor_engine::CycleEvent;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

/// What the board knows about one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolStatus {
    pub symbol: String,
    pub market: Option<Market>,
    pub running: bool,
    pub cycles: u64,
    /// Failed cycles since the last completed one
    pub consecutive_failures: u32,
    pub last_result: Option<CycleResult>,
    pub last_error: Option<CycleError>,
    pub updated_at: DateTime<Utc>,
}

impl SymbolStatus {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            market: None,
            running: true,
            cycles: 0,
            consecutive_failures: 0,
            last_result: None,
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Collects [`CycleEvent`]s from running loops.
#[derive(Debug, Default)]
pub struct StatusBoard {
    symbols: RwLock<HashMap<String, SymbolStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn apply(&self, event: &CycleEvent) {
        let mut symbols = self.symbols.write().await;
        match event {
            CycleEvent::Completed(result) => {
                let status = symbols
                    .entry(result.symbol.clone())
                    .or_insert_with(|| SymbolStatus::new(&result.symbol));
                status.market = Some(result.market);
                status.running = true;
                status.cycles += 1;
                status.consecutive_failures = 0;
                status.last_result = Some(result.clone());
                status.updated_at = result.timestamp;
            }
            CycleEvent::Failed { symbol, market, error } => {
                let status = symbols.entry(symbol.clone()).or_insert_with(|| SymbolStatus::new(symbol));
                status.market = Some(*market);
                status.running = true;
                status.cycles += 1;
                status.consecutive_failures += 1;
                status.last_error = Some(error.clone());
                status.updated_at = Utc::now();
            }
            CycleEvent::Stopped { symbol } => {
                if let Some(status) = symbols.get_mut(symbol) {
                    status.running = false;
                    status.updated_at = Utc::now();
                }
            }
        }
    }

    pub async fn get(&self, symbol: &str) -> Option<SymbolStatus> {
        self.symbols.read().await.get(symbol).cloned()
    }

    /// All symbols, sorted by name.
    pub async fn snapshot(&self) -> Vec<SymbolStatus> {
        let mut all: Vec<_> = self.symbols.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    /// One line per symbol.
    pub async fn render(&self) -> String {
        let mut out = String::new();
        for status in self.snapshot().await {
            let state = if status.running { "running" } else { "stopped" };
            match &status.last_result {
                Some(r) => out.push_str(&format!(
                    "{:<12} {:<8} {:<8} price={:.4} forecast={:.4} sentiment={:+.3} buy={:.2} sell={:.2} position={} leverage={}x cycles={} failures={}\n",
                    status.symbol,
                    r.market,
                    state,
                    r.current_price,
                    r.predicted_price,
                    r.sentiment_score,
                    r.buy_confidence,
                    r.sell_confidence,
                    r.in_position,
                    r.leverage,
                    status.cycles,
                    status.consecutive_failures
                )),
                None => out.push_str(&format!(
                    "{:<12} {:<8} {:<8} no completed cycle, cycles={} failures={}\n",
                    status.symbol,
                    status.market.map(|m| m.to_string()).unwrap_or_default(),
                    state,
                    status.cycles,
                    status.consecutive_failures
                )),
            }
        }
        out
    }

    /// Consume events until every sender is gone.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<CycleEvent>) {
        while let Some(event) = events.recv().await {
            match &event {
                CycleEvent::Completed(result) => {
                    if !matches!(result.action, CycleAction::None) {
                        info!(symbol = %result.symbol, market = %result.market, action = ?result.action, "Cycle acted");
                    }
                    if result.degraded {
                        warn!(symbol = %result.symbol, market = %result.market, faults = result.faults.len(), "Cycle ran degraded");
                    }
                }
                CycleEvent::Failed { symbol, market, error } => {
                    warn!(symbol = %symbol, market = %market, error = %error, "Cycle failed");
                }
                CycleEvent::Stopped { symbol } => {
                    info!(symbol = %symbol, "Loop stopped");
                }
            }
            self.apply(&event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptor_core::types::VolatilityProfile;
    use rust_decimal_macros::dec;

    fn completed(symbol: &str, price: f64) -> CycleEvent {
        CycleEvent::Completed(CycleResult {
            symbol: symbol.to_string(),
            market: Market::Spot,
            timestamp: Utc::now(),
            current_price: price,
            predicted_price: price,
            sentiment_score: 0.0,
            buy_confidence: 0.0,
            sell_confidence: 0.0,
            buy_signal: false,
            sell_signal: false,
            in_position: false,
            oscillator_value: 50.0,
            trend_difference: 0.0,
            band_upper: price,
            band_lower: price,
            stop_loss: None,
            take_profit: Some(dec!(105)),
            leverage: 1,
            margin_ratio: None,
            volatility: VolatilityProfile::default(),
            action: CycleAction::None,
            degraded: false,
            faults: Vec::new(),
        })
    }

    fn failed(symbol: &str) -> CycleEvent {
        CycleEvent::Failed {
            symbol: symbol.to_string(),
            market: Market::Spot,
            error: CycleError::DataUnavailable("offline".to_string()),
        }
    }

    #[tokio::test]
    async fn test_keeps_latest_result() {
        let board = StatusBoard::new();
        board.apply(&completed("BTC/USDT", 100.0)).await;
        board.apply(&completed("BTC/USDT", 101.0)).await;

        let status = board.get("BTC/USDT").await.unwrap();
        assert_eq!(status.cycles, 2);
        assert_eq!(status.last_result.unwrap().current_price, 101.0);
    }

    #[tokio::test]
    async fn test_failures_reset_on_completion() {
        let board = StatusBoard::new();
        board.apply(&failed("ETH/USDT")).await;
        board.apply(&failed("ETH/USDT")).await;
        assert_eq!(board.get("ETH/USDT").await.unwrap().consecutive_failures, 2);

        board.apply(&completed("ETH/USDT", 10.0)).await;
        let status = board.get("ETH/USDT").await.unwrap();
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let board = Arc::new(StatusBoard::new());
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(board.clone().run(rx));

        tx.send(completed("SOL/USDT", 20.0)).await.unwrap();
        tx.send(completed("BTC/USDT", 100.0)).await.unwrap();
        tx.send(CycleEvent::Stopped {
            symbol: "SOL/USDT".to_string(),
        })
        .await
        .unwrap();
        drop(tx);
        task.await.unwrap();

        let all = board.snapshot().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].symbol, "BTC/USDT");
        assert!(!all[1].running);
        assert!(board.render().await.contains("stopped"));
    }
}
