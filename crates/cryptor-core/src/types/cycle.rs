//! Evaluation cycle request and result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Market, OptionParams, Side, SymbolPair, VolatilityProfile};
use crate::error::CycleError;

/// "Run one cycle for this symbol in this market."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRequest {
    /// `BASE/QUOTE` symbol
    pub symbol: String,
    /// Asset name used to look up sentiment texts; defaults to the base asset
    pub asset: Option<String>,
    pub market: Market,
    /// Explicit leverage overriding the dynamic value (futures only)
    pub leverage: Option<u32>,
    /// Option contract parameters (option market only)
    pub option: Option<OptionParams>,
}

impl CycleRequest {
    pub fn new(symbol: impl Into<String>, market: Market) -> Self {
        Self {
            symbol: symbol.into(),
            asset: None,
            market,
            leverage: None,
            option: None,
        }
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = Some(asset.into());
        self
    }

    pub fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = Some(leverage);
        self
    }

    pub fn with_option(mut self, params: OptionParams) -> Self {
        self.option = Some(params);
        self
    }

    /// Parse and check the request before any port is called.
    pub fn validate(&self) -> Result<SymbolPair, CycleError> {
        let pair = SymbolPair::parse(&self.symbol).map_err(CycleError::InvalidRequest)?;
        if self.option.is_some() && self.market != Market::Option {
            return Err(CycleError::InvalidRequest(format!(
                "option parameters supplied for {} market",
                self.market
            )));
        }
        if self.leverage.is_some() && self.market != Market::Futures {
            return Err(CycleError::InvalidRequest(format!(
                "explicit leverage is only valid for futures, got {}",
                self.market
            )));
        }
        Ok(pair)
    }

    /// Name passed to the text feed and sentiment model.
    pub fn asset_name(&self, pair: &SymbolPair) -> String {
        self.asset.clone().unwrap_or_else(|| pair.base.clone())
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    MarginFailure,
    OptionExpired,
    /// Fresh sell decision
    Signal,
}

impl ExitReason {
    /// Forced exits come from risk rules rather than a sell signal.
    pub fn is_forced(&self) -> bool {
        !matches!(self, ExitReason::Signal)
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop-loss",
            ExitReason::TakeProfit => "take-profit",
            ExitReason::MarginFailure => "margin failure",
            ExitReason::OptionExpired => "option expired",
            ExitReason::Signal => "sell signal",
        };
        write!(f, "{}", s)
    }
}

/// What a cycle did to the symbol's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleAction {
    /// No order and no state change
    #[default]
    None,
    /// A position was opened
    Entered {
        order_id: Option<Uuid>,
        price: Decimal,
        quantity: Decimal,
    },
    /// The position was closed
    Exited {
        reason: ExitReason,
        order_id: Option<Uuid>,
        price: Decimal,
    },
    /// An order was accepted but has not filled yet
    Submitted { side: Side, order_id: Uuid },
    /// A pending order from an earlier cycle was cancelled
    Cancelled { order_id: Uuid },
}

/// Read-only outputs of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub symbol: String,
    pub market: Market,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub predicted_price: f64,
    pub sentiment_score: f64,
    pub buy_confidence: f64,
    pub sell_confidence: f64,
    pub buy_signal: bool,
    pub sell_signal: bool,
    /// Position state after this cycle
    pub in_position: bool,
    pub oscillator_value: f64,
    pub trend_difference: f64,
    pub band_upper: f64,
    pub band_lower: f64,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub leverage: u32,
    pub margin_ratio: Option<f64>,
    pub volatility: VolatilityProfile,
    pub action: CycleAction,
    /// A model call failed and a fallback value was used
    pub degraded: bool,
    /// Non-fatal failures recorded during the cycle
    pub faults: Vec<CycleError>,
}

impl CycleResult {
    pub fn traded(&self) -> bool {
        !matches!(self.action, CycleAction::None)
    }
}
