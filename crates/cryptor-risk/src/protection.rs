//! Stop-loss and take-profit levels.

use cryptor_core::types::{Position, ProtectiveLevels};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fixed-fraction protective levels for long entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionPolicy {
    /// Fraction below entry, e.g. 0.02 for 2%
    pub stop_loss_pct: Decimal,
    /// Fraction above entry
    pub take_profit_pct: Decimal,
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            stop_loss_pct: dec!(0.02),
            take_profit_pct: dec!(0.05),
        }
    }
}

/// Which protective level a price has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionTrigger {
    StopLoss,
    TakeProfit,
}

impl ProtectionPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            return Err(format!("stop_loss_pct must be in (0, 1), got {}", self.stop_loss_pct));
        }
        if self.take_profit_pct <= Decimal::ZERO {
            return Err(format!("take_profit_pct must be positive, got {}", self.take_profit_pct));
        }
        Ok(())
    }

    /// Levels for a long entry at `entry_price`.
    pub fn levels_for(&self, entry_price: Decimal) -> ProtectiveLevels {
        ProtectiveLevels {
            stop_loss: entry_price * (Decimal::ONE - self.stop_loss_pct),
            take_profit: entry_price * (Decimal::ONE + self.take_profit_pct),
        }
    }

    /// Check a long position's levels at `price`. Stop-loss is checked first.
    pub fn check(&self, position: &Position, price: Decimal) -> Option<ProtectionTrigger> {
        let levels = position.protection?;
        if price <= levels.stop_loss {
            Some(ProtectionTrigger::StopLoss)
        } else if price >= levels.take_profit {
            Some(ProtectionTrigger::TakeProfit)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptor_core::types::Market;

    #[test]
    fn test_levels_from_entry() {
        let levels = ProtectionPolicy::default().levels_for(dec!(100));
        assert_eq!(levels.stop_loss, dec!(98.00));
        assert_eq!(levels.take_profit, dec!(105.00));
    }

    #[test]
    fn test_triggers() {
        let policy = ProtectionPolicy::default();
        let position = Position::long(
            "BTC/USDT",
            Market::Spot,
            dec!(100),
            dec!(0.001),
            1,
            policy.levels_for(dec!(100)),
        )
        .unwrap();

        assert_eq!(policy.check(&position, dec!(97)), Some(ProtectionTrigger::StopLoss));
        assert_eq!(policy.check(&position, dec!(98)), Some(ProtectionTrigger::StopLoss));
        assert_eq!(policy.check(&position, dec!(106)), Some(ProtectionTrigger::TakeProfit));
        assert_eq!(policy.check(&position, dec!(105)), Some(ProtectionTrigger::TakeProfit));
        assert_eq!(policy.check(&position, dec!(100)), None);
    }

    #[test]
    fn test_validate() {
        assert!(ProtectionPolicy::default().validate().is_ok());
        let bad = ProtectionPolicy {
            stop_loss_pct: dec!(1.5),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
