//! Exchange adapters.

mod paper;

pub use paper::{CallCounts, FailureScript, FillMode, PaperExchange};
