//! Routing of accepted decisions to the exchange.

use std::time::Duration;

use cryptor_core::error::CycleError;
use cryptor_core::traits::{with_timeout, Exchange};
use cryptor_core::types::{Market, Order, OrderRequest, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// When position state follows an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Only a confirmed fill opens or closes a position
    #[default]
    Confirmed,
    /// Treat exchange acceptance as a fill at the limit price
    Optimistic,
}

/// Outcome of a dispatched order.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The order filled (or is treated as filled under the optimistic policy)
    Filled { order: Order, price: Decimal },
    /// Accepted and still working after the confirmation window
    Pending(Order),
}

/// Places one limit order per decision and waits briefly for its fill.
#[derive(Debug, Clone)]
pub struct ExecutionDispatcher {
    policy: FillPolicy,
    confirm_attempts: u32,
    confirm_interval: Duration,
    port_timeout: Duration,
}

impl ExecutionDispatcher {
    pub fn new(policy: FillPolicy, confirm_attempts: u32, confirm_interval: Duration, port_timeout: Duration) -> Self {
        Self {
            policy,
            confirm_attempts,
            confirm_interval,
            port_timeout,
        }
    }

    /// Place a limit order for `quantity` at `price` and report how far it got.
    ///
    /// Spot and futures share this path; futures leverage must already be
    /// applied on the exchange.
    pub async fn execute(
        &self,
        exchange: &dyn Exchange,
        symbol: &str,
        side: Side,
        price: Decimal,
        market: Market,
        quantity: Decimal,
    ) -> Result<Dispatch, CycleError> {
        if !market.is_order_routed() {
            return Err(CycleError::InvalidRequest(format!("{} decisions place no orders", market)));
        }

        let request = OrderRequest::limit(symbol, market, side, quantity, price);
        let order = with_timeout(self.port_timeout, exchange.place_limit_order(request))
            .await
            .map_err(|e| {
                warn!(symbol, %market, %side, error = %e, "Order placement failed");
                CycleError::Execution(e.to_string())
            })?;
        info!(
            symbol,
            %market,
            %side,
            %quantity,
            %price,
            order_id = %order.id,
            exchange = exchange.name(),
            "Order accepted"
        );

        if self.policy == FillPolicy::Optimistic {
            return Ok(Dispatch::Filled {
                price: order.execution_price(),
                order,
            });
        }
        self.confirm(exchange, order).await
    }

    /// Poll an accepted order until it fills, fails or the window closes.
    async fn confirm(&self, exchange: &dyn Exchange, mut order: Order) -> Result<Dispatch, CycleError> {
        let mut attempt = 0;
        loop {
            if order.is_filled() {
                return Ok(Dispatch::Filled {
                    price: order.execution_price(),
                    order,
                });
            }
            if order.status.is_terminal() {
                warn!(symbol = %order.symbol, order_id = %order.id, status = ?order.status, "Order ended unfilled");
                return Err(CycleError::Execution(format!("order {} ended {:?}", order.id, order.status)));
            }
            if attempt >= self.confirm_attempts {
                debug!(symbol = %order.symbol, order_id = %order.id, "Order still working");
                return Ok(Dispatch::Pending(order));
            }
            attempt += 1;

            tokio::time::sleep(self.confirm_interval).await;
            match with_timeout(self.port_timeout, exchange.order_status(order.id)).await {
                Ok(latest) => order = latest,
                Err(e) => {
                    warn!(symbol = %order.symbol, order_id = %order.id, error = %e, "Order status unavailable");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptor_broker::{FailureScript, FillMode, PaperExchange};
    use cryptor_core::types::OrderStatus;
    use rust_decimal_macros::dec;

    fn dispatcher(policy: FillPolicy) -> ExecutionDispatcher {
        ExecutionDispatcher::new(policy, 2, Duration::from_millis(5), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_immediate_fill() {
        let exchange = PaperExchange::new("USDT", dec!(1000));
        let outcome = dispatcher(FillPolicy::Confirmed)
            .execute(&exchange, "BTC/USDT", Side::Buy, dec!(100), Market::Spot, dec!(1))
            .await
            .unwrap();
        assert!(matches!(outcome, Dispatch::Filled { price, .. } if price == dec!(100)));
    }

    #[tokio::test]
    async fn test_unfilled_order_is_pending() {
        let exchange = PaperExchange::new("USDT", dec!(1000)).with_fill_mode(FillMode::Manual);
        let outcome = dispatcher(FillPolicy::Confirmed)
            .execute(&exchange, "BTC/USDT", Side::Buy, dec!(100), Market::Spot, dec!(1))
            .await
            .unwrap();
        match outcome {
            Dispatch::Pending(order) => assert_eq!(order.status, OrderStatus::Accepted),
            other => panic!("expected pending, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_optimistic_treats_acceptance_as_fill() {
        let exchange = PaperExchange::new("USDT", dec!(1000)).with_fill_mode(FillMode::Manual);
        let outcome = dispatcher(FillPolicy::Optimistic)
            .execute(&exchange, "BTC/USDT", Side::Buy, dec!(100), Market::Spot, dec!(1))
            .await
            .unwrap();
        assert!(matches!(outcome, Dispatch::Filled { price, .. } if price == dec!(100)));
    }

    #[tokio::test]
    async fn test_rejection_is_execution_failure() {
        let exchange = PaperExchange::new("USDT", dec!(1000));
        exchange.script(FailureScript {
            reject_orders: true,
            ..Default::default()
        });
        let err = dispatcher(FillPolicy::Confirmed)
            .execute(&exchange, "BTC/USDT", Side::Buy, dec!(100), Market::Spot, dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::Execution(_)));
    }

    #[tokio::test]
    async fn test_options_are_not_routed() {
        let exchange = PaperExchange::new("USDT", dec!(1000));
        let err = dispatcher(FillPolicy::Confirmed)
            .execute(&exchange, "BTC/USDT", Side::Buy, dec!(100), Market::Option, dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::InvalidRequest(_)));
        assert_eq!(exchange.calls().orders(), 0);
    }
}
