//! # ideaforge-core
//!
//! The iteration controller: runs creator, refiner and judge in order until
//! an idea is accepted and written up, the iteration budget runs out, or the
//! user interrupts.

mod context;
mod error;
mod loop_runner;
mod outcome;

pub use context::{IterationRecord, IterationResult, LoopContext};
pub use error::LoopError;
pub use loop_runner::LoopRunner;
pub use outcome::{LoopOutcome, NO_VIABLE_IDEA};
