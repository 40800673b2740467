//! Historical bar sources and replay feeds.

mod csv_source;
mod replay;

pub use csv_source::{load_bars, save_bars};
pub use replay::{Advance, ReplayFeed};
