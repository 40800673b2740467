//! Logging and cycle status reporting.

mod logging;
mod status;

pub use logging::setup_logging;
pub use status::{StatusBoard, SymbolStatus};
