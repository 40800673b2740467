//! Risk supervision of an open position.
//!
//! Runs before any fresh decision in a cycle and checks, in order:
//! 1. stop-loss
//! 2. take-profit
//! 3. margin maintenance (futures only), topping up below the threshold
//! 4. option expiry
//!
//! The first rule that fires decides the cycle. A forced exit or expiry
//! preempts any fresh buy or sell decision for the symbol.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cryptor_core::error::CycleError;
use cryptor_core::traits::{with_timeout, Exchange};
use cryptor_core::types::{ExitReason, Market, OptionKind, Position};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::protection::{ProtectionPolicy, ProtectionTrigger};

/// Futures margin maintenance settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginPolicy {
    /// Ratio below which a top-up is attempted
    pub threshold: f64,
    /// Quote amount transferred per top-up
    pub buffer: Decimal,
}

impl Default for MarginPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            buffer: dec!(100),
        }
    }
}

/// Outcome of supervising a position for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskDirective {
    /// Keep the position; fresh decisions may run
    Hold,
    /// Close the position through an exit order
    ForceExit(ExitReason),
    /// Clear a worthless expired option without an order
    Expire,
}

impl RiskDirective {
    pub fn preempts(&self) -> bool {
        !matches!(self, RiskDirective::Hold)
    }
}

/// Directive plus what was observed while reaching it.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskVerdict {
    pub directive: RiskDirective,
    pub margin_ratio: Option<f64>,
    pub topped_up: bool,
    pub faults: Vec<CycleError>,
}

impl RiskVerdict {
    fn hold() -> Self {
        Self {
            directive: RiskDirective::Hold,
            margin_ratio: None,
            topped_up: false,
            faults: Vec::new(),
        }
    }
}

/// Evaluates open positions against protective, margin and expiry rules.
#[derive(Debug, Clone)]
pub struct RiskSupervisor {
    protection: ProtectionPolicy,
    margin: MarginPolicy,
    port_timeout: Duration,
}

impl RiskSupervisor {
    pub fn new(protection: ProtectionPolicy, margin: MarginPolicy, port_timeout: Duration) -> Self {
        Self {
            protection,
            margin,
            port_timeout,
        }
    }

    pub fn protection(&self) -> &ProtectionPolicy {
        &self.protection
    }

    /// Supervise `position` at `price`.
    ///
    /// Exchange failures never escape: an unreadable margin ratio is logged
    /// and skipped, a failed top-up becomes a forced exit.
    pub async fn evaluate(
        &self,
        exchange: &dyn Exchange,
        position: &Position,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> RiskVerdict {
        let mut verdict = RiskVerdict::hold();
        let symbol = position.symbol.as_str();

        if let Some(trigger) = self.protection.check(position, price) {
            let reason = match trigger {
                ProtectionTrigger::StopLoss => ExitReason::StopLoss,
                ProtectionTrigger::TakeProfit => ExitReason::TakeProfit,
            };
            info!(
                symbol,
                market = %position.market,
                %price,
                stop_loss = ?position.stop_loss(),
                take_profit = ?position.take_profit(),
                "{} triggered",
                reason
            );
            verdict.directive = RiskDirective::ForceExit(reason);
            return verdict;
        }

        if position.market == Market::Futures {
            self.maintain_margin(exchange, position, &mut verdict).await;
            if verdict.directive.preempts() {
                return verdict;
            }
        }

        if let Some(option) = &position.option {
            if option.is_expired(now) {
                if option.kind == OptionKind::Call && price < option.strike_price {
                    info!(
                        symbol,
                        strike = %option.strike_price,
                        %price,
                        expiry = %option.expiry,
                        "Call expired out of the money, clearing position"
                    );
                    verdict.directive = RiskDirective::Expire;
                    return verdict;
                }
                debug!(
                    symbol,
                    kind = ?option.kind,
                    strike = %option.strike_price,
                    %price,
                    "Option past expiry but not a worthless call, left open"
                );
            }
        }

        verdict
    }

    async fn maintain_margin(&self, exchange: &dyn Exchange, position: &Position, verdict: &mut RiskVerdict) {
        let symbol = position.symbol.as_str();

        let ratio = match with_timeout(self.port_timeout, exchange.margin_ratio(symbol)).await {
            Ok(Some(ratio)) => ratio,
            Ok(None) => {
                debug!(symbol, "No margin ratio reported");
                return;
            }
            Err(e) => {
                warn!(symbol, error = %e, "Margin ratio unavailable, skipping maintenance");
                return;
            }
        };
        verdict.margin_ratio = Some(ratio);

        if ratio >= self.margin.threshold {
            return;
        }

        warn!(
            symbol,
            ratio,
            threshold = self.margin.threshold,
            buffer = %self.margin.buffer,
            "Margin ratio below threshold, topping up"
        );
        match with_timeout(self.port_timeout, exchange.transfer_margin(symbol, self.margin.buffer)).await {
            Ok(()) => {
                info!(symbol, amount = %self.margin.buffer, "Margin topped up");
                verdict.topped_up = true;
            }
            Err(e) => {
                warn!(symbol, error = %e, "Margin top-up failed, forcing exit");
                verdict.faults.push(CycleError::Margin(e.to_string()));
                verdict.directive = RiskDirective::ForceExit(ExitReason::MarginFailure);
            }
        }
    }
}

impl Default for RiskSupervisor {
    fn default() -> Self {
        Self::new(
            ProtectionPolicy::default(),
            MarginPolicy::default(),
            Duration::from_secs(10),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use cryptor_core::error::PortError;
    use cryptor_core::types::{Balances, OptionParams, Order, OrderRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Exchange stub answering only the margin calls.
    struct MarginDesk {
        ratio: Result<Option<f64>, PortError>,
        transfer_ok: bool,
        transfers: AtomicUsize,
        orders: AtomicUsize,
    }

    impl MarginDesk {
        fn new(ratio: Result<Option<f64>, PortError>, transfer_ok: bool) -> Self {
            Self {
                ratio,
                transfer_ok,
                transfers: AtomicUsize::new(0),
                orders: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Exchange for MarginDesk {
        async fn fetch_balances(&self, _market: Market) -> Result<Balances, PortError> {
            Ok(Balances::new())
        }

        async fn place_limit_order(&self, request: OrderRequest) -> Result<Order, PortError> {
            self.orders.fetch_add(1, Ordering::SeqCst);
            Ok(Order::from_request(&request))
        }

        async fn order_status(&self, order_id: Uuid) -> Result<Order, PortError> {
            Err(PortError::NotFound(order_id.to_string()))
        }

        async fn cancel_order(&self, _order_id: Uuid) -> Result<(), PortError> {
            Ok(())
        }

        async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<(), PortError> {
            Ok(())
        }

        async fn transfer_margin(&self, _symbol: &str, _amount: Decimal) -> Result<(), PortError> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            if self.transfer_ok {
                Ok(())
            } else {
                Err(PortError::Rejected("insufficient spot balance".into()))
            }
        }

        async fn margin_ratio(&self, _symbol: &str) -> Result<Option<f64>, PortError> {
            self.ratio.clone()
        }

        fn name(&self) -> &str {
            "margin-desk"
        }
    }

    fn futures_position() -> Position {
        let policy = ProtectionPolicy::default();
        Position::long(
            "BTC/USDT",
            Market::Futures,
            dec!(100),
            dec!(0.001),
            5,
            policy.levels_for(dec!(100)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_stop_loss_and_take_profit() {
        let supervisor = RiskSupervisor::default();
        let desk = MarginDesk::new(Ok(Some(0.5)), true);
        let position = futures_position();

        let verdict = supervisor.evaluate(&desk, &position, dec!(97), Utc::now()).await;
        assert_eq!(verdict.directive, RiskDirective::ForceExit(ExitReason::StopLoss));

        let verdict = supervisor.evaluate(&desk, &position, dec!(106), Utc::now()).await;
        assert_eq!(verdict.directive, RiskDirective::ForceExit(ExitReason::TakeProfit));

        let verdict = supervisor.evaluate(&desk, &position, dec!(100), Utc::now()).await;
        assert_eq!(verdict.directive, RiskDirective::Hold);
        assert_eq!(verdict.margin_ratio, Some(0.5));
        assert_eq!(desk.orders.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_low_margin_tops_up() {
        let supervisor = RiskSupervisor::default();
        let desk = MarginDesk::new(Ok(Some(0.15)), true);

        let verdict = supervisor.evaluate(&desk, &futures_position(), dec!(100), Utc::now()).await;
        assert_eq!(verdict.directive, RiskDirective::Hold);
        assert!(verdict.topped_up);
        assert_eq!(desk.transfers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_top_up_forces_exit() {
        let supervisor = RiskSupervisor::default();
        let desk = MarginDesk::new(Ok(Some(0.15)), false);

        let verdict = supervisor.evaluate(&desk, &futures_position(), dec!(100), Utc::now()).await;
        assert_eq!(verdict.directive, RiskDirective::ForceExit(ExitReason::MarginFailure));
        assert!(matches!(verdict.faults.as_slice(), [CycleError::Margin(_)]));
    }

    #[tokio::test]
    async fn test_unavailable_ratio_is_skipped() {
        let supervisor = RiskSupervisor::default();
        let desk = MarginDesk::new(Err(PortError::Unavailable("down".into())), false);

        let verdict = supervisor.evaluate(&desk, &futures_position(), dec!(100), Utc::now()).await;
        assert_eq!(verdict.directive, RiskDirective::Hold);
        assert!(verdict.margin_ratio.is_none());
        assert_eq!(desk.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_spot_position_skips_margin() {
        let supervisor = RiskSupervisor::default();
        let desk = MarginDesk::new(Ok(Some(0.01)), false);
        let position = Position::long(
            "BTC/USDT",
            Market::Spot,
            dec!(100),
            dec!(0.001),
            1,
            ProtectionPolicy::default().levels_for(dec!(100)),
        )
        .unwrap();

        let verdict = supervisor.evaluate(&desk, &position, dec!(100), Utc::now()).await;
        assert_eq!(verdict.directive, RiskDirective::Hold);
        assert_eq!(desk.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_out_of_the_money_call_clears() {
        let supervisor = RiskSupervisor::default();
        let desk = MarginDesk::new(Ok(None), true);
        let now = Utc::now();
        let call = OptionParams {
            kind: OptionKind::Call,
            strike_price: dec!(50),
            expiry: now - ChronoDuration::hours(1),
        };
        let position = Position::option("ETH/USDT", dec!(45), dec!(1), call.clone()).unwrap();

        let verdict = supervisor.evaluate(&desk, &position, dec!(40), now).await;
        assert_eq!(verdict.directive, RiskDirective::Expire);
        assert_eq!(desk.orders.load(Ordering::SeqCst), 0);

        // in the money: left open
        let verdict = supervisor.evaluate(&desk, &position, dec!(60), now).await;
        assert_eq!(verdict.directive, RiskDirective::Hold);

        // not expired yet
        let live = Position::option(
            "ETH/USDT",
            dec!(45),
            dec!(1),
            OptionParams {
                expiry: now + ChronoDuration::hours(1),
                ..call
            },
        )
        .unwrap();
        let verdict = supervisor.evaluate(&desk, &live, dec!(40), now).await;
        assert_eq!(verdict.directive, RiskDirective::Hold);
    }

    #[tokio::test]
    async fn test_expired_put_is_not_cleared() {
        let supervisor = RiskSupervisor::default();
        let desk = MarginDesk::new(Ok(None), true);
        let now = Utc::now();
        let put = OptionParams {
            kind: OptionKind::Put,
            strike_price: dec!(50),
            expiry: now - ChronoDuration::hours(1),
        };
        let position = Position::option("ETH/USDT", dec!(45), dec!(1), put).unwrap();

        let verdict = supervisor.evaluate(&desk, &position, dec!(40), now).await;
        assert_eq!(verdict.directive, RiskDirective::Hold);
    }
}
