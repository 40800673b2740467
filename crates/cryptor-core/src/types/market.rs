//! Markets, trading pairs and option contract parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market an evaluation loop trades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    #[default]
    Spot,
    Futures,
    Option,
}

impl Market {
    /// Spot and futures trade through limit orders; options do not.
    pub fn is_order_routed(&self) -> bool {
        matches!(self, Market::Spot | Market::Futures)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Spot => write!(f, "spot"),
            Market::Futures => write!(f, "futures"),
            Market::Option => write!(f, "option"),
        }
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(Market::Spot),
            "futures" | "future" | "perp" => Ok(Market::Futures),
            "option" | "options" => Ok(Market::Option),
            _ => Err(format!("Invalid market: {}", s)),
        }
    }
}

/// A `BASE/QUOTE` trading pair such as `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolPair {
    pub base: String,
    pub quote: String,
}

impl SymbolPair {
    /// Parse a `BASE/QUOTE` symbol.
    pub fn parse(symbol: &str) -> Result<Self, String> {
        let (base, quote) = symbol
            .split_once('/')
            .ok_or_else(|| format!("Symbol must look like BASE/QUOTE: {}", symbol))?;
        let (base, quote) = (base.trim(), quote.trim());
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return Err(format!("Symbol must look like BASE/QUOTE: {}", symbol));
        }
        Ok(Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        })
    }
}

impl fmt::Display for SymbolPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Option contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

/// Parameters of an option entry supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionParams {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub strike_price: rust_decimal::Decimal,
    pub expiry: DateTime<Utc>,
}

impl OptionParams {
    /// Whether the contract has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_pair_parse() {
        let pair = SymbolPair::parse("btc/usdt").unwrap();
        assert_eq!(pair.base, "BTC");
        assert_eq!(pair.quote, "USDT");
        assert_eq!(pair.to_string(), "BTC/USDT");

        assert!(SymbolPair::parse("BTCUSDT").is_err());
        assert!(SymbolPair::parse("/USDT").is_err());
        assert!(SymbolPair::parse("A/B/C").is_err());
    }

    #[test]
    fn test_market_parse() {
        assert_eq!(Market::from_str("futures").unwrap(), Market::Futures);
        assert_eq!(Market::from_str("Option").unwrap(), Market::Option);
        assert!(Market::from_str("margin").is_err());
        assert!(Market::Spot.is_order_routed());
        assert!(!Market::Option.is_order_routed());
    }
}
