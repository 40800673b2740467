//! Backtest statistics.

use chrono::{DateTime, Utc};
use cryptor_core::types::{ExitReason, Side};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One fill during the replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub leverage: u32,
    /// Set on exits
    pub reason: Option<ExitReason>,
    /// Realized P&L, set on exits
    pub pnl: Option<Decimal>,
}

/// Running and final statistics of a replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    pub initial_balance: Decimal,
    pub final_balance: Decimal,
    pub profit: Decimal,
    pub profit_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    /// Per-bar Sharpe ratio, risk-free rate 0
    pub sharpe_ratio: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Decimal,
    /// Gross profit / gross loss
    pub profit_factor: Decimal,
    pub cycles: usize,
    pub failed_cycles: usize,
    pub equity_curve: Vec<(i64, Decimal)>,
    pub trades: Vec<TradeRecord>,
    peak_equity: Decimal,
    returns: Vec<f64>,
}

impl BacktestStats {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            final_balance: initial_balance,
            profit: Decimal::ZERO,
            profit_pct: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: 0.0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            cycles: 0,
            failed_cycles: 0,
            equity_curve: Vec::new(),
            trades: Vec::new(),
            peak_equity: initial_balance,
            returns: Vec::new(),
        }
    }

    /// Record mark-to-market equity after a bar.
    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) {
        if let Some((_, prev)) = self.equity_curve.last() {
            if *prev > Decimal::ZERO {
                let ret = ((equity - *prev) / *prev).to_f64().unwrap_or(0.0);
                self.returns.push(ret);
            }
        }
        self.equity_curve.push((timestamp, equity));

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * dec!(100);
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    pub fn add_trade(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
        self.total_trades += 1;
    }

    /// Compute the summary figures from the final balance.
    pub fn finalize(&mut self, final_balance: Decimal) {
        self.final_balance = final_balance;
        self.profit = final_balance - self.initial_balance;
        if self.initial_balance > Decimal::ZERO {
            self.profit_pct = self.profit / self.initial_balance * dec!(100);
        }

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut closed = 0usize;
        for pnl in self.trades.iter().filter_map(|t| t.pnl) {
            closed += 1;
            if pnl > Decimal::ZERO {
                self.winning_trades += 1;
                gross_profit += pnl;
            } else if pnl < Decimal::ZERO {
                self.losing_trades += 1;
                gross_loss += pnl.abs();
            }
        }
        if closed > 0 {
            self.win_rate_pct = Decimal::from(self.winning_trades * 100) / Decimal::from(closed);
        }
        if gross_loss > Decimal::ZERO {
            self.profit_factor = gross_profit / gross_loss;
        }

        if self.returns.len() > 1 {
            let n = self.returns.len() as f64;
            let mean = self.returns.iter().sum::<f64>() / n;
            let variance = self.returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();
            if std_dev > 0.0 {
                self.sharpe_ratio = mean / std_dev;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit(pnl: Decimal) -> TradeRecord {
        TradeRecord {
            timestamp: Utc::now(),
            side: Side::Sell,
            price: dec!(100),
            quantity: dec!(1),
            leverage: 1,
            reason: Some(ExitReason::Signal),
            pnl: Some(pnl),
        }
    }

    #[test]
    fn test_drawdown_tracks_peak() {
        let mut stats = BacktestStats::new(dec!(1000));
        stats.record_equity(0, dec!(1000));
        stats.record_equity(1, dec!(1200));
        stats.record_equity(2, dec!(900));
        stats.record_equity(3, dec!(1100));
        assert_eq!(stats.max_drawdown_pct, dec!(25));
    }

    #[test]
    fn test_finalize_trade_figures() {
        let mut stats = BacktestStats::new(dec!(1000));
        stats.add_trade(exit(dec!(30)));
        stats.add_trade(exit(dec!(-10)));
        stats.add_trade(exit(dec!(20)));
        stats.finalize(dec!(1040));

        assert_eq!(stats.profit, dec!(40));
        assert_eq!(stats.profit_pct, dec!(4));
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.profit_factor, dec!(5));
        assert_eq!(stats.win_rate_pct.round_dp(2), dec!(66.67));
    }
}
