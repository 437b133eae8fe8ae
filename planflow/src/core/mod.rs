//! Core domain model types for planflow.
//!
//! This module contains the fundamental types shared by plans and executors:
//! - Step identifiers
//! - Step type and completion state enums
//! - Completion status trees with the aggregation rule

mod completion;
mod id;
mod status;

pub use completion::CompletionStatus;
pub use id::StepId;
pub use status::{CompletionState, StepType};
