//! Core runtime types shared across the engine.

pub mod cancel;
pub mod event_bus;
pub mod run_context;
pub mod value;

pub use cancel::CancelFlag;
pub use event_bus::{EngineEvent, EventEmitter};
pub use run_context::{NodeRecord, NodeStatus, RunContext, RunStatus, RunStore};
pub use value::{Value, ValueMap};
