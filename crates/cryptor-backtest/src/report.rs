//! Backtest report generation.

use cryptor_core::types::{Market, Position};
use serde::{Deserialize, Serialize};

use crate::{BacktestConfig, BacktestStats};

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub market: Market,
    /// Configuration used
    pub config: BacktestConfig,
    pub stats: BacktestStats,
    /// Leverage in force at the last cycle
    pub final_leverage: u32,
    /// Position still open after the last bar
    pub open_position: Option<Position>,
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!("  Symbol:              {} ({})\n\n", self.symbol, self.market));

        s.push_str("BALANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Initial Balance:     {:.2}\n", self.stats.initial_balance));
        s.push_str(&format!("  Final Balance:       {:.2}\n", self.stats.final_balance));
        s.push_str(&format!(
            "  Profit:              {:.2} ({:.2}%)\n",
            self.stats.profit, self.stats.profit_pct
        ));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", self.stats.max_drawdown_pct));
        s.push_str(&format!("  Sharpe (per bar):    {:.3}\n", self.stats.sharpe_ratio));
        s.push_str(&format!("  Final Leverage:      {}x\n", self.final_leverage));
        s.push('\n');

        s.push_str("TRADES\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", self.stats.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", self.stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", self.stats.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", self.stats.win_rate_pct));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", self.stats.profit_factor));
        if let Some(position) = &self.open_position {
            s.push_str(&format!(
                "  Open Position:       {} @ {}\n",
                position.quantity, position.entry_price
            ));
        }
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Cycles Run:          {}\n", self.stats.cycles));
        s.push_str(&format!("  Failed Cycles:       {}\n", self.stats.failed_cycles));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV (equity curve only).
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for (ts, equity) in &self.stats.equity_curve {
            csv.push_str(&format!("{},{}\n", ts, equity));
        }
        csv
    }
}
