//! Turning fused signals into at most one candidate action, and the balance
//! gates an action must pass before it is dispatched.

use cryptor_core::types::{Balances, Market, SymbolPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fusion::FusedSignal;

/// Action a cycle may take when no risk rule preempted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Candidate {
    None,
    Buy,
    Sell,
    /// Option entry with caller-supplied parameters
    OptionEntry,
}

/// Result of checking a candidate against free balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Accepted,
    InsufficientQuote { asset: String, required: Decimal, available: Decimal },
    InsufficientBase { asset: String, required: Decimal, available: Decimal },
}

impl Gate {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Gate::Accepted)
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::Accepted => write!(f, "accepted"),
            Gate::InsufficientQuote {
                asset,
                required,
                available,
            } => write!(f, "need more than {} {} free, have {}", required, asset, available),
            Gate::InsufficientBase {
                asset,
                required,
                available,
            } => write!(f, "need {} {} free, have {}", required, asset, available),
        }
    }
}

/// Picks the candidate action and gates it on balances.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    trade_amount: Decimal,
}

impl DecisionEngine {
    pub fn new(trade_amount: Decimal) -> Self {
        Self { trade_amount }
    }

    pub fn trade_amount(&self) -> Decimal {
        self.trade_amount
    }

    /// Candidate action for the symbol's state.
    ///
    /// Option markets bypass confidence entirely: an entry is proposed when
    /// parameters are supplied and the symbol is flat.
    pub fn candidate(&self, market: Market, in_position: bool, fused: &FusedSignal, option_supplied: bool) -> Candidate {
        match market {
            Market::Option => {
                if option_supplied && !in_position {
                    Candidate::OptionEntry
                } else {
                    Candidate::None
                }
            }
            Market::Spot | Market::Futures => {
                if fused.buy_signal && !in_position {
                    Candidate::Buy
                } else if fused.sell_signal && in_position {
                    Candidate::Sell
                } else {
                    Candidate::None
                }
            }
        }
    }

    /// Quote amount a buy must exceed: `amount * price / leverage_factor`.
    pub fn required_quote(&self, price: Decimal, market: Market, leverage: u32) -> Decimal {
        let factor = match market {
            Market::Futures => Decimal::from(leverage.max(1)),
            Market::Spot | Market::Option => Decimal::ONE,
        };
        self.trade_amount * price / factor
    }

    /// Check a buy or sell against free balances.
    pub fn gate(
        &self,
        candidate: Candidate,
        pair: &SymbolPair,
        balances: &Balances,
        price: Decimal,
        market: Market,
        leverage: u32,
    ) -> Gate {
        match candidate {
            Candidate::Buy => {
                let required = self.required_quote(price, market, leverage);
                let available = balances.free(&pair.quote);
                if available > required {
                    Gate::Accepted
                } else {
                    Gate::InsufficientQuote {
                        asset: pair.quote.clone(),
                        required,
                        available,
                    }
                }
            }
            Candidate::Sell => {
                let available = balances.free(&pair.base);
                if available >= self.trade_amount {
                    Gate::Accepted
                } else {
                    Gate::InsufficientBase {
                        asset: pair.base.clone(),
                        required: self.trade_amount,
                        available,
                    }
                }
            }
            Candidate::None | Candidate::OptionEntry => Gate::Accepted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signal(buy: bool, sell: bool) -> FusedSignal {
        FusedSignal {
            buy_signal: buy,
            sell_signal: sell,
            ..Default::default()
        }
    }

    fn pair() -> SymbolPair {
        SymbolPair::parse("BTC/USDT").unwrap()
    }

    #[test]
    fn test_candidate_respects_position_state() {
        let engine = DecisionEngine::new(dec!(0.001));
        assert_eq!(engine.candidate(Market::Spot, false, &signal(true, false), false), Candidate::Buy);
        assert_eq!(engine.candidate(Market::Spot, true, &signal(true, false), false), Candidate::None);
        assert_eq!(engine.candidate(Market::Futures, true, &signal(false, true), false), Candidate::Sell);
        assert_eq!(engine.candidate(Market::Futures, false, &signal(false, true), false), Candidate::None);
        assert_eq!(engine.candidate(Market::Spot, false, &signal(true, true), false), Candidate::Buy);
        assert_eq!(engine.candidate(Market::Spot, true, &signal(true, true), false), Candidate::Sell);
    }

    #[test]
    fn test_option_candidate_ignores_signals() {
        let engine = DecisionEngine::new(dec!(0.001));
        assert_eq!(engine.candidate(Market::Option, false, &signal(false, false), true), Candidate::OptionEntry);
        assert_eq!(engine.candidate(Market::Option, true, &signal(true, false), true), Candidate::None);
        assert_eq!(engine.candidate(Market::Option, false, &signal(true, false), false), Candidate::None);
    }

    #[test]
    fn test_buy_gate_uses_leverage_factor() {
        let engine = DecisionEngine::new(dec!(0.001));
        let balances = Balances::new().with("USDT", dec!(12));

        // spot needs more than 0.001 * 50000 = 50
        let gate = engine.gate(Candidate::Buy, &pair(), &balances, dec!(50000), Market::Spot, 5);
        assert!(!gate.is_accepted());

        // futures at 5x needs more than 10
        let gate = engine.gate(Candidate::Buy, &pair(), &balances, dec!(50000), Market::Futures, 5);
        assert!(gate.is_accepted());
    }

    #[test]
    fn test_buy_gate_is_strict() {
        let engine = DecisionEngine::new(dec!(0.001));
        let balances = Balances::new().with("USDT", dec!(50));
        let gate = engine.gate(Candidate::Buy, &pair(), &balances, dec!(50000), Market::Spot, 1);
        assert!(matches!(gate, Gate::InsufficientQuote { .. }));
    }

    #[test]
    fn test_sell_gate_needs_base_amount() {
        let engine = DecisionEngine::new(dec!(0.001));
        let exact = Balances::new().with("BTC", dec!(0.001));
        assert!(engine
            .gate(Candidate::Sell, &pair(), &exact, dec!(50000), Market::Spot, 1)
            .is_accepted());

        let short = Balances::new().with("BTC", dec!(0.0005));
        let gate = engine.gate(Candidate::Sell, &pair(), &short, dec!(50000), Market::Spot, 1);
        assert_eq!(
            gate,
            Gate::InsufficientBase {
                asset: "BTC".into(),
                required: dec!(0.001),
                available: dec!(0.0005)
            }
        );
    }
}
