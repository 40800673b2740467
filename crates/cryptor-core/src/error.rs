//! Error types for the decision engine.
//!
//! Port implementations report [`PortError`]. The engine converts every port
//! failure into exactly one [`CycleError`] kind at the call site, so a failed
//! exchange or model call never escapes a cycle as an untyped error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by an external collaborator (exchange, data feed, model).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortError {
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),
}

/// Error kinds a single evaluation cycle can end with or record.
///
/// `DataUnavailable`, `InsufficientHistory` and `InvalidRequest` abort the
/// cycle before any decision logic. The remaining kinds are recorded on the
/// cycle result as faults.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CycleError {
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient history: need {required} bars, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Margin top-up failed: {0}")]
    Margin(String),

    #[error("Model call failed: {0}")]
    Model(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CycleError {
    /// Whether this error stops the cycle before any decision is taken.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            CycleError::DataUnavailable(_)
                | CycleError::InsufficientHistory { .. }
                | CycleError::InvalidRequest(_)
        )
    }
}

impl From<IndicatorError> for CycleError {
    fn from(err: IndicatorError) -> Self {
        match err {
            IndicatorError::InsufficientData {
                required,
                available,
            } => CycleError::InsufficientHistory {
                required,
                available,
            },
            other => CycleError::DataUnavailable(other.to_string()),
        }
    }
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Historical data loading errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available: {0}")]
    NoDataAvailable(String),

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Position store access errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Position already open for {0}")]
    AlreadyOpen(String),

    #[error("No open position for {0}")]
    NotOpen(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

/// Scheduler and engine lifecycle errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("A loop is already running for {0}")]
    AlreadyRunning(String),

    #[error("No loop running for {0}")]
    NotRunning(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_kinds() {
        assert!(CycleError::DataUnavailable("x".into()).is_abort());
        assert!(CycleError::InsufficientHistory { required: 51, available: 10 }.is_abort());
        assert!(!CycleError::BalanceUnavailable("x".into()).is_abort());
        assert!(!CycleError::Margin("x".into()).is_abort());
    }

    #[test]
    fn test_indicator_error_maps_to_insufficient_history() {
        let err: CycleError = IndicatorError::InsufficientData {
            required: 51,
            available: 20,
        }
        .into();
        assert_eq!(
            err,
            CycleError::InsufficientHistory {
                required: 51,
                available: 20
            }
        );
    }

    #[test]
    fn test_cycle_error_serializes_with_kind_tag() {
        let json = serde_json::to_string(&CycleError::Model("forecast".into())).unwrap();
        assert_eq!(json, r#"{"kind":"model","detail":"forecast"}"#);
    }
}
