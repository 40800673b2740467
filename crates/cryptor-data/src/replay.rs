//! Replays recorded bars through the market data port.

use async_trait::async_trait;
use cryptor_core::error::PortError;
use cryptor_core::traits::MarketData;
use cryptor_core::types::{Bar, Timeframe};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// How a replay moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Advance {
    /// Only [`ReplayFeed::step`] reveals bars
    #[default]
    Manual,
    /// Every `fetch_bars` call reveals one more bar first
    OnFetch,
}

#[derive(Debug)]
struct Series {
    bars: Vec<Bar>,
    visible: usize,
    price: Option<f64>,
}

impl Series {
    fn window(&self, limit: usize) -> Vec<Bar> {
        let start = self.visible.saturating_sub(limit);
        self.bars[start..self.visible].to_vec()
    }
}

/// In-memory market data source that reveals a recorded history one bar at a time.
///
/// The realtime price is the close of the newest visible bar unless
/// overridden with [`ReplayFeed::set_price`].
#[derive(Debug, Default)]
pub struct ReplayFeed {
    series: Mutex<HashMap<String, Series>>,
    advance: Advance,
    unavailable: AtomicBool,
}

impl ReplayFeed {
    pub fn new(advance: Advance) -> Self {
        Self {
            advance,
            ..Default::default()
        }
    }

    fn series(&self) -> Result<MutexGuard<'_, HashMap<String, Series>>, PortError> {
        self.series
            .lock()
            .map_err(|_| PortError::Unavailable("replay state poisoned".to_string()))
    }

    /// Register a history with the first `visible` bars already revealed.
    pub fn insert(&self, symbol: impl Into<String>, mut bars: Vec<Bar>, visible: usize) {
        bars.sort_by_key(|b| b.timestamp);
        let visible = visible.min(bars.len());
        if let Ok(mut series) = self.series.lock() {
            series.insert(symbol.into(), Series { bars, visible, price: None });
        }
    }

    /// Reveal the next bar. Returns `false` once the history is exhausted.
    pub fn step(&self, symbol: &str) -> bool {
        let Ok(mut series) = self.series.lock() else {
            return false;
        };
        match series.get_mut(symbol) {
            Some(s) if s.visible < s.bars.len() => {
                s.visible += 1;
                s.price = None;
                true
            }
            _ => false,
        }
    }

    /// Bars not yet revealed.
    pub fn remaining(&self, symbol: &str) -> usize {
        self.series
            .lock()
            .ok()
            .and_then(|series| series.get(symbol).map(|s| s.bars.len() - s.visible))
            .unwrap_or(0)
    }

    /// Newest revealed bar.
    pub fn current_bar(&self, symbol: &str) -> Option<Bar> {
        let series = self.series.lock().ok()?;
        let s = series.get(symbol)?;
        s.visible.checked_sub(1).map(|i| s.bars[i])
    }

    /// Override the realtime price until the next bar is revealed.
    pub fn set_price(&self, symbol: &str, price: f64) {
        if let Ok(mut series) = self.series.lock() {
            if let Some(s) = series.get_mut(symbol) {
                s.price = Some(price);
            }
        }
    }

    /// Make every fetch fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self, symbol: &str) -> Result<(), PortError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable(format!("market data for {} offline", symbol)));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketData for ReplayFeed {
    async fn fetch_bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>, PortError> {
        self.check_available(symbol)?;
        let mut series = self.series()?;
        let s = series
            .get_mut(symbol)
            .ok_or_else(|| PortError::NotFound(symbol.to_string()))?;

        if self.advance == Advance::OnFetch {
            if s.visible >= s.bars.len() {
                return Err(PortError::Unavailable(format!("replay of {} exhausted", symbol)));
            }
            s.visible += 1;
            s.price = None;
        }

        trace!(symbol, %timeframe, visible = s.visible, limit, "Replay bars");
        Ok(s.window(limit))
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64, PortError> {
        self.check_available(symbol)?;
        let series = self.series()?;
        let s = series
            .get(symbol)
            .ok_or_else(|| PortError::NotFound(symbol.to_string()))?;
        s.price
            .or_else(|| s.visible.checked_sub(1).map(|i| s.bars[i].close))
            .ok_or_else(|| PortError::Unavailable(format!("no price for {}", symbol)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar::new(i as i64 * 3_600_000, close, close + 1.0, close - 1.0, close, 10.0)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_manual_replay() {
        let feed = ReplayFeed::new(Advance::Manual);
        feed.insert("BTC/USDT", bars(10), 5);

        let window = feed.fetch_bars("BTC/USDT", Timeframe::Hour1, 3).await.unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[2].close, 104.0);
        assert_eq!(feed.fetch_price("BTC/USDT").await.unwrap(), 104.0);

        assert!(feed.step("BTC/USDT"));
        assert_eq!(feed.fetch_price("BTC/USDT").await.unwrap(), 105.0);
        assert_eq!(feed.remaining("BTC/USDT"), 4);
    }

    #[tokio::test]
    async fn test_on_fetch_replay_runs_out() {
        let feed = ReplayFeed::new(Advance::OnFetch);
        feed.insert("BTC/USDT", bars(3), 1);

        assert_eq!(feed.fetch_bars("BTC/USDT", Timeframe::Hour1, 10).await.unwrap().len(), 2);
        assert_eq!(feed.fetch_bars("BTC/USDT", Timeframe::Hour1, 10).await.unwrap().len(), 3);
        assert!(feed.fetch_bars("BTC/USDT", Timeframe::Hour1, 10).await.is_err());
    }

    #[tokio::test]
    async fn test_price_override_and_outage() {
        let feed = ReplayFeed::new(Advance::Manual);
        feed.insert("ETH/USDT", bars(4), 4);
        feed.set_price("ETH/USDT", 90.0);
        assert_eq!(feed.fetch_price("ETH/USDT").await.unwrap(), 90.0);

        feed.set_unavailable(true);
        assert!(matches!(
            feed.fetch_price("ETH/USDT").await,
            Err(PortError::Unavailable(_))
        ));
        assert!(matches!(
            feed.fetch_bars("SOL/USDT", Timeframe::Hour1, 1).await,
            Err(PortError::Unavailable(_))
        ));

        feed.set_unavailable(false);
        assert!(matches!(
            feed.fetch_bars("SOL/USDT", Timeframe::Hour1, 1).await,
            Err(PortError::NotFound(_))
        ));
    }
}
