//! Risk management for the decision engine.
//!
//! Provides the volatility estimator, the dynamic leverage controller,
//! protective levels and the per-position risk supervisor.

mod leverage;
mod protection;
mod supervisor;
mod volatility;

pub use leverage::{LeverageConfig, LeverageController};
pub use protection::{ProtectionPolicy, ProtectionTrigger};
pub use supervisor::{MarginPolicy, RiskDirective, RiskSupervisor, RiskVerdict};
pub use volatility::{pct_change, VolatilityEstimator};
