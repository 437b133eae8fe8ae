//! Plan trees: steps, leaf actions and plan construction.
//!
//! Steps are immutable once built and shared as `Arc<Step>` between the plan
//! and the executors created for a run.

mod action;
mod builder;
mod definition;
mod step;

pub use action::{ActionOutput, FnAction, StepAction};
pub use builder::CompositeStepBuilder;
pub use definition::Plan;
pub use step::{Step, StepKind};
