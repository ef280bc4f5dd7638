//! # azlin-fleet
//!
//! The Fleet Operations Engine: bounded-concurrency stop/start/exec/
//! tag/sync across a glob/all/list selector, with cooperative
//! cancellation and a stable-sorted result summary.

pub mod engine;
pub mod op;
pub mod selector;

pub use engine::{CancelToken, FleetEngine, PerVmResult, Summary, DEFAULT_CONCURRENCY};
pub use op::FleetOp;
pub use selector::Selector;
