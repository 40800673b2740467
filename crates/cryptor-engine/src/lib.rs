//! Cycle orchestration for the decision engine.
//!
//! [`Engine`] owns the position store and runs one evaluation cycle per
//! request; [`Scheduler`] drives periodic cycles, one task per symbol.

mod config;
mod cycle;
mod dispatcher;
mod scheduler;
mod store;

pub use config::{EngineConfig, VolatilityWindows};
pub use cycle::{Engine, EnginePorts};
pub use dispatcher::{Dispatch, ExecutionDispatcher, FillPolicy};
pub use scheduler::{CycleEvent, ScheduleConfig, Scheduler};
pub use store::{PendingOrder, PositionStore, SymbolState};
