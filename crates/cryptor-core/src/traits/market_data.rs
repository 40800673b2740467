//! Market data port.

use async_trait::async_trait;

use crate::error::PortError;
use crate::types::{Bar, Timeframe};

/// Source of historical bars and realtime prices.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch up to `limit` most recent bars, oldest first.
    async fn fetch_bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>, PortError>;

    /// Fetch the latest traded price.
    async fn fetch_price(&self, symbol: &str) -> Result<f64, PortError>;
}
