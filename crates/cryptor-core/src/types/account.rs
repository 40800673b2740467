//! Free account balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free (available) balance per asset for one market account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    free: HashMap<String, Decimal>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, asset: impl Into<String>, amount: Decimal) -> Self {
        self.set(asset, amount);
        self
    }

    pub fn set(&mut self, asset: impl Into<String>, amount: Decimal) {
        self.free.insert(asset.into().to_uppercase(), amount);
    }

    /// Free amount of `asset`; assets the account never held count as zero.
    pub fn free(&self, asset: &str) -> Decimal {
        self.free
            .get(&asset.to_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Adjust an asset balance by a signed delta.
    pub fn adjust(&mut self, asset: &str, delta: Decimal) {
        *self.free.entry(asset.to_uppercase()).or_insert(Decimal::ZERO) += delta;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decimal)> {
        self.free.iter()
    }
}

impl FromIterator<(String, Decimal)> for Balances {
    fn from_iter<T: IntoIterator<Item = (String, Decimal)>>(iter: T) -> Self {
        let mut balances = Balances::new();
        for (asset, amount) in iter {
            balances.set(asset, amount);
        }
        balances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_asset_is_zero() {
        let balances = Balances::new().with("usdt", dec!(1000));
        assert_eq!(balances.free("USDT"), dec!(1000));
        assert_eq!(balances.free("BTC"), Decimal::ZERO);
    }

    #[test]
    fn test_adjust() {
        let mut balances = Balances::new().with("USDT", dec!(100));
        balances.adjust("usdt", dec!(-40));
        balances.adjust("BTC", dec!(0.5));
        assert_eq!(balances.free("USDT"), dec!(60));
        assert_eq!(balances.free("btc"), dec!(0.5));
    }
}
