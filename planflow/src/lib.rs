//! # Planflow
//!
//! Sequential and parallel step executors for deployment plan runs.
//!
//! A plan is a tree of steps. Leaf steps perform work through a
//! [`StepAction`](plan::StepAction); composite steps group children and run
//! them either one after another or concurrently:
//!
//! - **Parallel fan-out/fan-in**: launch every child in order, then join them
//!   in the same order
//! - **Sequential execution**: each child finishes before the next starts,
//!   with a configurable failure mode
//! - **Status trees**: every step yields a
//!   [`CompletionStatus`](core::CompletionStatus) whose children mirror the
//!   plan
//! - **Cooperative cancellation**: a run-scoped flag stops new launches and
//!   unblocks pending joins
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use planflow::prelude::*;
//!
//! let plan = CompositeStepBuilder::sequential("rollout")
//!     .leaf("drain", DrainAction::new())
//!     .parallel_group("hosts", |hosts| {
//!         hosts.leaf("host-1", UpgradeAction::new("host-1"))
//!              .leaf("host-2", UpgradeAction::new("host-2"))
//!     })
//!     .leaf("undrain", UndrainAction::new())
//!     .build_plan()?;
//!
//! let status = PlanRunner::new().run(&plan).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod observability;
pub mod plan;
pub mod runner;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ExecutionConfig, FailureMode, LogConfig};
    pub use crate::context::{ExecutionContext, StepContext};
    pub use crate::core::{CompletionState, CompletionStatus, StepId, StepType};
    pub use crate::errors::{
        IllegalCallOrderError, PlanValidationError, PlanflowError, PlanflowResult,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::executor::{
        create_executor, ExecutorPhase, ExecutorRegistry, ParallelStepExecutor,
        SequentialStepExecutor, StepExecutor,
    };
    pub use crate::observability::{init_tracing, StepSpanAttributes};
    pub use crate::plan::{ActionOutput, CompositeStepBuilder, FnAction, Plan, Step, StepAction};
    pub use crate::runner::{PlanRunner, RunHandle};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
