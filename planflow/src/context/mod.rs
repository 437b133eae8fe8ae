//! Run-scoped state shared by executors.
//!
//! - [`ExecutionContext`]: one per run, holds cancellation, the executor
//!   registry, the event sink and the execution config
//! - [`StepContext`]: the view handed to a leaf action

mod execution;
mod step_context;

pub use execution::ExecutionContext;
pub use step_context::StepContext;
