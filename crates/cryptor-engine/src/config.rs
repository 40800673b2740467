//! Engine settings.

use std::time::Duration;

use cryptor_core::error::EngineError;
use cryptor_core::types::Timeframe;
use cryptor_indicators::IndicatorParams;
use cryptor_risk::{LeverageConfig, MarginPolicy, ProtectionPolicy, VolatilityEstimator};
use cryptor_strategy::FusionConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::dispatcher::FillPolicy;

/// Return-volatility look-back windows, in bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityWindows {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
}

impl Default for VolatilityWindows {
    fn default() -> Self {
        Self {
            short: 5,
            medium: 20,
            long: 50,
        }
    }
}

impl VolatilityWindows {
    pub fn estimator(&self) -> VolatilityEstimator {
        VolatilityEstimator::new(self.short, self.medium, self.long)
    }
}

/// Settings for one [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base-asset quantity per order
    pub trade_amount: Decimal,
    pub timeframe: Timeframe,
    /// Bars requested per cycle
    pub history_limit: usize,
    pub leverage: LeverageConfig,
    pub protection: ProtectionPolicy,
    pub margin: MarginPolicy,
    pub fusion: FusionConfig,
    pub indicators: IndicatorParams,
    pub volatility: VolatilityWindows,
    pub fill_policy: FillPolicy,
    /// Status polls after placement before an order is left pending
    pub confirm_attempts: u32,
    pub confirm_interval_ms: u64,
    /// Cycles a pending order may stay open before it is cancelled
    pub pending_ttl_cycles: u32,
    pub port_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trade_amount: dec!(0.001),
            timeframe: Timeframe::Hour1,
            history_limit: 200,
            leverage: LeverageConfig::default(),
            protection: ProtectionPolicy::default(),
            margin: MarginPolicy::default(),
            fusion: FusionConfig::default(),
            indicators: IndicatorParams::default(),
            volatility: VolatilityWindows::default(),
            fill_policy: FillPolicy::Confirmed,
            confirm_attempts: 3,
            confirm_interval_ms: 500,
            pending_ttl_cycles: 3,
            port_timeout_secs: 10,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.trade_amount <= Decimal::ZERO {
            return Err(EngineError::Config(format!(
                "trade_amount must be positive, got {}",
                self.trade_amount
            )));
        }
        let v = &self.volatility;
        if !(v.short >= 2 && v.short < v.medium && v.medium < v.long) {
            return Err(EngineError::Config(format!(
                "volatility windows must be increasing and at least 2, got {}/{}/{}",
                v.short, v.medium, v.long
            )));
        }
        self.indicators
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        if self.history_limit < self.required_bars() {
            return Err(EngineError::Config(format!(
                "history_limit {} is below the {} bars indicators need",
                self.history_limit,
                self.required_bars()
            )));
        }
        if self.leverage.min > self.leverage.max {
            return Err(EngineError::Config(format!(
                "leverage min {} exceeds max {}",
                self.leverage.min, self.leverage.max
            )));
        }
        if !(0.0..1.0).contains(&self.margin.threshold) || self.margin.buffer <= Decimal::ZERO {
            return Err(EngineError::Config(
                "margin threshold must be in [0, 1) and buffer positive".to_string(),
            ));
        }
        if self.port_timeout_secs == 0 {
            return Err(EngineError::Config("port_timeout_secs must be positive".to_string()));
        }
        self.protection.validate().map_err(EngineError::Config)?;
        self.fusion.validate().map_err(EngineError::Config)?;
        Ok(())
    }

    /// Bars a cycle needs before any decision can be taken.
    pub fn required_bars(&self) -> usize {
        self.indicators.required_bars().max(self.volatility.long + 1)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_secs(self.port_timeout_secs)
    }

    pub fn confirm_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.required_bars(), 51);
        assert_eq!(config.trade_amount, dec!(0.001));
    }

    #[test]
    fn test_rejects_short_history() {
        let config = EngineConfig {
            history_limit: 30,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_unordered_windows() {
        let config = EngineConfig {
            volatility: VolatilityWindows {
                short: 20,
                medium: 5,
                long: 50,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
