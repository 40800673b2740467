//! Exchange port.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::PortError;
use crate::types::{Balances, Market, Order, OrderRequest};

/// Account and order operations on a spot/futures exchange.
///
/// Implementations must report an accepted order with a non-terminal status
/// until the exchange confirms the fill.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Free balances of the account for `market`.
    async fn fetch_balances(&self, market: Market) -> Result<Balances, PortError>;

    /// Submit a limit order.
    ///
    /// # Returns
    /// The order as accepted by the exchange. It may already be filled.
    async fn place_limit_order(&self, request: OrderRequest) -> Result<Order, PortError>;

    /// Current state of a previously placed order.
    async fn order_status(&self, order_id: Uuid) -> Result<Order, PortError>;

    /// Cancel an open order.
    async fn cancel_order(&self, order_id: Uuid) -> Result<(), PortError>;

    /// Set futures leverage for a symbol.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), PortError>;

    /// Move `amount` of quote currency into the symbol's futures margin.
    async fn transfer_margin(&self, symbol: &str, amount: Decimal) -> Result<(), PortError>;

    /// Collateral adequacy of the symbol's futures position.
    ///
    /// `Ok(None)` when the exchange reports no ratio for the symbol.
    async fn margin_ratio(&self, symbol: &str) -> Result<Option<f64>, PortError>;

    fn name(&self) -> &str;
}
