//! Order types and structures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Market;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order accepted by the exchange, nothing filled yet
    Accepted,
    /// Order partially filled
    PartiallyFilled,
    /// Order completely filled
    Filled,
    /// Order canceled
    Canceled,
    /// Order rejected
    Rejected,
    /// Order expired
    Expired,
}

impl OrderStatus {
    /// Check if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }

    /// Check if the order is active (can still be filled).
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Accepted | OrderStatus::PartiallyFilled)
    }
}

/// Limit order request routed to a spot or futures account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Symbol to trade (`BASE/QUOTE`)
    pub symbol: String,
    /// Account the order is placed in
    pub market: Market,
    pub side: Side,
    pub quantity: Decimal,
    pub limit_price: Decimal,
    /// Client-provided order ID
    pub client_order_id: Option<String>,
}

impl OrderRequest {
    /// Create a limit order request.
    pub fn limit(
        symbol: impl Into<String>,
        market: Market,
        side: Side,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            side,
            quantity,
            limit_price,
            client_order_id: None,
        }
    }

    /// Set a client order ID.
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Quote value of the order at its limit price.
    pub fn notional(&self) -> Decimal {
        self.quantity * self.limit_price
    }
}

/// A fill represents a partial or complete execution of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: Uuid,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Order as known by the exchange, with status and fill information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID
    pub id: Uuid,
    pub client_order_id: String,
    pub symbol: String,
    pub market: Market,
    pub side: Side,
    /// Original quantity
    pub quantity: Decimal,
    pub limit_price: Decimal,
    pub status: OrderStatus,
    /// Quantity filled so far
    pub filled_quantity: Decimal,
    /// Average fill price
    pub filled_avg_price: Option<Decimal>,
    pub fills: Vec<Fill>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create an accepted order from a request.
    pub fn from_request(request: &OrderRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_order_id: request
                .client_order_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            symbol: request.symbol.clone(),
            market: request.market,
            side: request.side,
            quantity: request.quantity,
            limit_price: request.limit_price,
            status: OrderStatus::Accepted,
            filled_quantity: Decimal::ZERO,
            filled_avg_price: None,
            fills: Vec::new(),
            created_at: now,
            updated_at: now,
            filled_at: None,
        }
    }

    /// Get the remaining quantity to be filled.
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Check if the order is completely filled.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Price the order executed at, falling back to the limit price.
    pub fn execution_price(&self) -> Decimal {
        self.filled_avg_price.unwrap_or(self.limit_price)
    }

    /// Add a fill to the order.
    pub fn add_fill(&mut self, fill: Fill) {
        let total_qty = self.filled_quantity + fill.quantity;
        let total_value = self.filled_avg_price.unwrap_or(Decimal::ZERO) * self.filled_quantity
            + fill.price * fill.quantity;

        if total_qty > Decimal::ZERO {
            self.filled_avg_price = Some(total_value / total_qty);
        }
        self.filled_quantity = total_qty;
        self.updated_at = fill.timestamp;
        self.fills.push(fill);

        if self.filled_quantity >= self.quantity {
            self.status = OrderStatus::Filled;
            self.filled_at = Some(self.updated_at);
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_request_limit() {
        let request = OrderRequest::limit("BTC/USDT", Market::Spot, Side::Buy, dec!(0.001), dec!(50000));
        assert_eq!(request.limit_price, dec!(50000));
        assert_eq!(request.notional(), dec!(50.000));
    }

    #[test]
    fn test_order_from_request_is_accepted() {
        let request = OrderRequest::limit("BTC/USDT", Market::Futures, Side::Sell, dec!(1), dec!(100))
            .with_client_order_id("cycle-1");
        let order = Order::from_request(&request);

        assert_eq!(order.client_order_id, "cycle-1");
        assert_eq!(order.status, OrderStatus::Accepted);
        assert!(order.status.is_active());
        assert_eq!(order.execution_price(), dec!(100));
    }

    #[test]
    fn test_order_add_fill() {
        let request = OrderRequest::limit("BTC/USDT", Market::Spot, Side::Buy, dec!(2), dec!(100));
        let mut order = Order::from_request(&request);

        order.add_fill(Fill {
            order_id: order.id,
            quantity: dec!(1),
            price: dec!(99),
            timestamp: Utc::now(),
        });
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_quantity(), dec!(1));

        order.add_fill(Fill {
            order_id: order.id,
            quantity: dec!(1),
            price: dec!(101),
            timestamp: Utc::now(),
        });
        assert!(order.is_filled());
        assert!(order.status.is_terminal());
        assert_eq!(order.execution_price(), dec!(100));
    }
}
