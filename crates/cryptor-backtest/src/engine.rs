//! Backtesting engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cryptor_broker::PaperExchange;
use cryptor_core::error::EngineError;
use cryptor_core::traits::{Forecaster, NoTexts};
use cryptor_core::types::{Bar, CycleAction, CycleRequest, Market, Position, Side, SymbolPair};
use cryptor_data::{Advance, ReplayFeed};
use cryptor_engine::{Engine, EngineConfig, EnginePorts, FillPolicy};
use cryptor_strategy::{LexiconScorer, LinearTrendForecaster, SentimentConfig, SentimentTracker};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::report::BacktestReport;
use crate::statistics::{BacktestStats, TradeRecord};

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Quote balance the paper account starts with
    pub initial_balance: Decimal,
    /// Bars revealed before the first cycle; raised to what the engine needs
    pub warmup_bars: usize,
    /// Fee charged on each fill's notional
    pub fee_rate: Decimal,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(10000),
            warmup_bars: 0,
            fee_rate: Decimal::ZERO,
        }
    }
}

/// Entry that a later exit is measured against.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    price: Decimal,
    quantity: Decimal,
}

/// Replays a bar history through the decision engine against a paper exchange.
pub struct BacktestEngine {
    config: BacktestConfig,
    forecaster: Arc<dyn Forecaster>,
}

impl BacktestEngine {
    /// Create a backtest using the linear trend forecaster.
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            forecaster: Arc::new(LinearTrendForecaster::default()),
        }
    }

    pub fn with_forecaster(mut self, forecaster: Arc<dyn Forecaster>) -> Self {
        self.forecaster = forecaster;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run one cycle per bar after the warmup and report the outcome.
    ///
    /// Fills are immediate at the cycle's price. A position still open after
    /// the last bar is marked to that bar's close.
    pub async fn run(
        &self,
        engine_config: EngineConfig,
        request: CycleRequest,
        bars: Vec<Bar>,
    ) -> Result<BacktestReport, EngineError> {
        request
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        if request.market == Market::Option {
            return Err(EngineError::Config("option markets cannot be backtested".to_string()));
        }
        let pair = SymbolPair::parse(&request.symbol).map_err(EngineError::Config)?;

        let engine_config = EngineConfig {
            fill_policy: FillPolicy::Confirmed,
            confirm_attempts: 0,
            ..engine_config
        };
        let warmup = self.config.warmup_bars.max(engine_config.required_bars());
        if bars.len() < warmup {
            return Err(EngineError::Config(format!(
                "{} bars supplied, at least {} needed",
                bars.len(),
                warmup
            )));
        }

        let feed = Arc::new(ReplayFeed::new(Advance::Manual));
        feed.insert(request.symbol.clone(), bars, warmup);
        let exchange = Arc::new(
            PaperExchange::new(&pair.quote, self.config.initial_balance).with_fee_rate(self.config.fee_rate),
        );
        let ports = EnginePorts {
            market_data: feed.clone(),
            exchange: exchange.clone(),
            texts: Arc::new(NoTexts),
            sentiment: Arc::new(SentimentTracker::new(LexiconScorer::default(), SentimentConfig::default())),
            forecaster: self.forecaster.clone(),
        };
        let engine = Engine::new(engine_config, ports)?;

        info!(
            symbol = %request.symbol,
            market = %request.market,
            bars = warmup + feed.remaining(&request.symbol),
            warmup,
            "Starting backtest"
        );

        let mut stats = BacktestStats::new(self.config.initial_balance);
        let mut entry: Option<OpenEntry> = None;
        let mut leverage = 1;
        let mut last_close = Decimal::ZERO;

        loop {
            let Some(bar) = feed.current_bar(&request.symbol) else {
                break;
            };
            let timestamp = DateTime::from_timestamp_millis(bar.timestamp).unwrap_or_else(Utc::now);
            last_close = Decimal::from_f64(bar.close).unwrap_or(last_close);
            stats.cycles += 1;

            match engine.run_cycle(&request).await {
                Ok(result) => {
                    leverage = result.leverage;
                    match result.action {
                        CycleAction::Entered { price, quantity, .. } => {
                            entry = Some(OpenEntry { price, quantity });
                            stats.add_trade(TradeRecord {
                                timestamp,
                                side: Side::Buy,
                                price,
                                quantity,
                                leverage,
                                reason: None,
                                pnl: None,
                            });
                        }
                        CycleAction::Exited { reason, price, .. } => {
                            let closed = entry.take();
                            let quantity = closed.map(|e| e.quantity).unwrap_or_default();
                            stats.add_trade(TradeRecord {
                                timestamp,
                                side: Side::Sell,
                                price,
                                quantity,
                                leverage,
                                reason: Some(reason),
                                pnl: closed.map(|e| (price - e.price) * e.quantity),
                            });
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    warn!(symbol = %request.symbol, market = %request.market, error = %e, "Backtest cycle failed");
                    stats.failed_cycles += 1;
                }
            }

            let position = engine.store().position(&request.symbol).await;
            let equity = mark_to_market(&exchange, &pair, request.market, position.as_ref(), last_close);
            stats.record_equity(bar.timestamp, equity);
            debug!(symbol = %request.symbol, timestamp = bar.timestamp, %equity, "Bar replayed");

            if !feed.step(&request.symbol) {
                break;
            }
        }

        let open_position = engine.store().position(&request.symbol).await;
        let final_balance = mark_to_market(&exchange, &pair, request.market, open_position.as_ref(), last_close);
        stats.finalize(final_balance);

        info!(
            symbol = %request.symbol,
            market = %request.market,
            trades = stats.total_trades,
            profit = %stats.profit,
            "Backtest finished"
        );

        Ok(BacktestReport {
            symbol: request.symbol,
            market: request.market,
            config: self.config.clone(),
            final_leverage: leverage,
            open_position,
            stats,
        })
    }
}

/// Account value in quote currency at `price`.
fn mark_to_market(
    exchange: &PaperExchange,
    pair: &SymbolPair,
    market: Market,
    position: Option<&Position>,
    price: Decimal,
) -> Decimal {
    let balances = exchange.balances(market);
    let quote = balances.free(&pair.quote);
    match market {
        Market::Spot => quote + balances.free(&pair.base) * price,
        _ => {
            let held = position
                .map(|p| p.entry_price * p.quantity / Decimal::from(p.leverage.max(1)) + (price - p.entry_price) * p.quantity)
                .unwrap_or_default();
            quote + held
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cryptor_core::error::PortError;
    use cryptor_core::types::{ExitReason, MarketSnapshot};

    struct FixedForecast(f64);

    #[async_trait]
    impl Forecaster for FixedForecast {
        async fn forecast_next(&self, _snapshot: &MarketSnapshot) -> Result<f64, PortError> {
            Ok(self.0)
        }
    }

    fn bar(i: usize, close: f64) -> Bar {
        Bar::new(i as i64 * 3_600_000, close, close + 0.5, close - 0.5, close, 10.0)
    }

    /// Flat at 100, a slide to 90, then one recovery bar at 95.
    fn dip_and_recovery() -> Vec<Bar> {
        let mut closes = vec![100.0; 55];
        closes.extend([99.0, 98.0, 97.0, 96.0, 90.0, 95.0]);
        closes.iter().enumerate().map(|(i, c)| bar(i, *c)).collect()
    }

    fn backtest() -> BacktestEngine {
        BacktestEngine::new(BacktestConfig {
            initial_balance: dec!(1000),
            warmup_bars: 60,
            fee_rate: Decimal::ZERO,
        })
        .with_forecaster(Arc::new(FixedForecast(100.0)))
    }

    #[tokio::test]
    async fn test_entry_then_take_profit() {
        let report = backtest()
            .run(EngineConfig::default(), CycleRequest::new("BTC/USDT", Market::Spot), dip_and_recovery())
            .await
            .unwrap();

        let trades = &report.stats.trades;
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].price, dec!(90));
        assert_eq!(trades[1].reason, Some(ExitReason::TakeProfit));
        assert_eq!(trades[1].pnl, Some(dec!(0.005)));

        assert_eq!(report.stats.cycles, 2);
        assert_eq!(report.stats.final_balance, dec!(1000.005));
        assert_eq!(report.stats.profit, dec!(0.005));
        assert_eq!(report.stats.winning_trades, 1);
        assert_eq!(report.final_leverage, 1);
        assert!(report.open_position.is_none());
    }

    #[tokio::test]
    async fn test_flat_history_never_trades() {
        let bars = (0..80).map(|i| bar(i, 100.0)).collect();
        let report = BacktestEngine::new(BacktestConfig::default())
            .run(EngineConfig::default(), CycleRequest::new("ETH/USDT", Market::Spot), bars)
            .await
            .unwrap();

        assert_eq!(report.stats.total_trades, 0);
        assert_eq!(report.stats.cycles, 30);
        assert_eq!(report.stats.final_balance, dec!(10000));
        assert_eq!(report.stats.max_drawdown_pct, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_open_position_marked_at_last_close() {
        let mut bars = dip_and_recovery();
        bars.pop();
        let report = backtest()
            .run(EngineConfig::default(), CycleRequest::new("BTC/USDT", Market::Spot), bars)
            .await
            .unwrap();

        assert_eq!(report.stats.total_trades, 1);
        assert!(report.open_position.is_some());
        assert_eq!(report.stats.final_balance, dec!(1000));
    }

    #[tokio::test]
    async fn test_rejects_short_history_and_options() {
        let short: Vec<Bar> = (0..20).map(|i| bar(i, 100.0)).collect();
        let err = backtest()
            .run(EngineConfig::default(), CycleRequest::new("BTC/USDT", Market::Spot), short)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = backtest()
            .run(EngineConfig::default(), CycleRequest::new("BTC/USDT", Market::Option), dip_and_recovery())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
