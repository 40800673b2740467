//! Open exposure held for a symbol.

use chrono::{DateTime, Utc};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Market, OptionKind, OptionParams};
use crate::error::StoreError;

/// Lowest leverage the engine will ever apply.
pub const MIN_LEVERAGE: u32 = 1;
/// Highest leverage the engine will ever apply.
pub const MAX_LEVERAGE: u32 = 20;

/// Direction of an open position. Only long exposure is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    #[default]
    Long,
}

/// Stop-loss and take-profit prices protecting a long position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectiveLevels {
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

/// A position in a single symbol.
///
/// Construct with [`Position::long`] or [`Position::option`]; both enforce
/// the invariants the risk supervisor relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    pub market: Market,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub leverage: u32,
    /// Set for spot and futures positions
    pub protection: Option<ProtectiveLevels>,
    /// Set for option positions
    pub option: Option<OptionParams>,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Open a long spot or futures position.
    ///
    /// Requires `stop_loss < entry_price < take_profit` and a leverage within
    /// [`MIN_LEVERAGE`, `MAX_LEVERAGE`]. Spot positions always carry leverage 1.
    pub fn long(
        symbol: impl Into<String>,
        market: Market,
        entry_price: Decimal,
        quantity: Decimal,
        leverage: u32,
        protection: ProtectiveLevels,
    ) -> Result<Self, StoreError> {
        let symbol = symbol.into();
        if !market.is_order_routed() {
            return Err(StoreError::InvalidPosition(format!(
                "{} positions are opened with Position::option",
                market
            )));
        }
        if quantity <= Decimal::ZERO {
            return Err(StoreError::InvalidPosition(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }
        if !(protection.stop_loss < entry_price && entry_price < protection.take_profit) {
            return Err(StoreError::InvalidPosition(format!(
                "expected stop {} < entry {} < take-profit {}",
                protection.stop_loss, entry_price, protection.take_profit
            )));
        }
        if !(MIN_LEVERAGE..=MAX_LEVERAGE).contains(&leverage) {
            return Err(StoreError::InvalidPosition(format!(
                "leverage {} outside [{}, {}]",
                leverage, MIN_LEVERAGE, MAX_LEVERAGE
            )));
        }
        let leverage = if market == Market::Spot { 1 } else { leverage };

        Ok(Self {
            symbol,
            side: PositionSide::Long,
            market,
            entry_price,
            quantity,
            leverage,
            protection: Some(protection),
            option: None,
            opened_at: Utc::now(),
        })
    }

    /// Open an option position. No exchange order backs it.
    pub fn option(
        symbol: impl Into<String>,
        entry_price: Decimal,
        quantity: Decimal,
        params: OptionParams,
    ) -> Result<Self, StoreError> {
        if params.strike_price <= Decimal::ZERO {
            return Err(StoreError::InvalidPosition(format!(
                "strike must be positive, got {}",
                params.strike_price
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            side: PositionSide::Long,
            market: Market::Option,
            entry_price,
            quantity,
            leverage: MIN_LEVERAGE,
            protection: None,
            option: Some(params),
            opened_at: Utc::now(),
        })
    }

    pub fn stop_loss(&self) -> Option<Decimal> {
        self.protection.map(|p| p.stop_loss)
    }

    pub fn take_profit(&self) -> Option<Decimal> {
        self.protection.map(|p| p.take_profit)
    }

    /// Option type, for option positions.
    pub fn option_kind(&self) -> Option<OptionKind> {
        self.option.as_ref().map(|o| o.kind)
    }

    /// Unrealized P&L at `price`, before leverage.
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity
    }

    /// Unrealized return on margin at `price`, as a fraction.
    pub fn return_on_margin(&self, price: Decimal) -> f64 {
        if self.entry_price == Decimal::ZERO {
            return 0.0;
        }
        let raw = ((price - self.entry_price) / self.entry_price)
            .to_f64()
            .unwrap_or(0.0);
        raw * self.leverage as f64
    }
}
