//! Step executors.
//!
//! Every step of a run gets exactly one executor, created through
//! [`create_executor`], the single dispatch point over [`StepKind`]. Executors
//! follow a two-call contract:
//!
//! - [`StepExecutor::execute`] starts the work and returns without waiting on
//!   children
//! - [`StepExecutor::wait_for_completion`] awaits the step and everything it
//!   started, computing the [`CompletionStatus`] once and caching it
//!
//! Composite executors share their child bookkeeping through
//! [`CompositeChildren`], which owns the child executors. The run's
//! [`ExecutorRegistry`] indexes every executor without keeping it alive.

mod composite;
mod leaf;
mod parallel;
mod registry;
mod sequential;
mod state;
mod task;

pub use composite::{ChildEntry, CompositeChildren};
pub use leaf::LeafStepExecutor;
pub use parallel::ParallelStepExecutor;
pub use registry::{ExecutorId, ExecutorRegistry, ExecutorSnapshot};
pub use sequential::SequentialStepExecutor;

use crate::context::ExecutionContext;
use crate::core::{CompletionStatus, StepId};
use crate::errors::PlanflowResult;
use crate::plan::{Step, StepKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where an executor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorPhase {
    /// Created, `execute()` not called yet.
    Created,
    /// `execute()` accepted; work in flight or awaiting a join.
    Running,
    /// `execute()` refused because the run was already cancelled.
    Refused,
    /// Terminal status computed.
    Finished,
}

impl fmt::Display for ExecutorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Refused => write!(f, "refused"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Runner bound to one step and one run.
#[async_trait]
pub trait StepExecutor: Send + Sync + fmt::Debug {
    /// Returns this executor's index in the run's registry.
    fn id(&self) -> ExecutorId;

    /// Returns the step this executor runs.
    fn step(&self) -> &Arc<Step>;

    /// Returns the current lifecycle phase.
    fn phase(&self) -> ExecutorPhase;

    /// Starts the step.
    ///
    /// Never waits on children. Returns [`PlanflowError::Cancelled`] without
    /// starting anything if the run is already cancelled, and
    /// [`PlanflowError::IllegalCallOrder`] if called twice.
    ///
    /// [`PlanflowError::Cancelled`]: crate::errors::PlanflowError::Cancelled
    /// [`PlanflowError::IllegalCallOrder`]: crate::errors::PlanflowError::IllegalCallOrder
    fn execute(&self) -> PlanflowResult<()>;

    /// Awaits the step and everything it started.
    ///
    /// The status is computed once; later calls return the same value.
    /// Returns [`PlanflowError::IllegalCallOrder`] if `execute()` was never
    /// called.
    ///
    /// [`PlanflowError::IllegalCallOrder`]: crate::errors::PlanflowError::IllegalCallOrder
    async fn wait_for_completion(&self) -> PlanflowResult<CompletionStatus>;

    /// Returns true once `execute()` has been called, accepted or refused.
    fn is_executed(&self) -> bool {
        self.phase() != ExecutorPhase::Created
    }

    /// Returns the cached status without waiting.
    fn status(&self) -> Option<CompletionStatus>;

    /// Returns the child executors created so far, in step order.
    fn children(&self) -> Vec<(StepId, Arc<dyn StepExecutor>)> {
        Vec::new()
    }
}

/// Creates the executor matching the step kind and registers it in the
/// context's registry.
pub fn create_executor(step: Arc<Step>, context: Arc<ExecutionContext>) -> Arc<dyn StepExecutor> {
    let run = Arc::clone(&context);
    run.registry().register(move |id| -> Arc<dyn StepExecutor> {
        let node = Arc::clone(&step);
        match step.kind() {
            StepKind::Leaf(action) => Arc::new(LeafStepExecutor::new(
                id,
                node,
                Arc::clone(action),
                context,
            )),
            StepKind::Sequential(_) => Arc::new(SequentialStepExecutor::new(id, node, context)),
            StepKind::Parallel(_) => Arc::new(ParallelStepExecutor::new(id, node, context)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StepType;
    use crate::testing::NoOpAction;

    #[tokio::test]
    async fn test_factory_dispatches_on_kind() {
        let ctx = Arc::new(ExecutionContext::new());
        let cases = [
            Step::leaf("leaf", NoOpAction),
            Step::sequential("seq", Vec::new()),
            Step::parallel("par", Vec::new()),
        ];

        for step in cases {
            let expected = step.step_type();
            let executor = create_executor(Arc::new(step), ctx.clone());
            assert_eq!(executor.step().step_type(), expected);
            assert_eq!(executor.phase(), ExecutorPhase::Created);
            let debug = format!("{executor:?}");
            let type_name = match expected {
                StepType::Leaf => "LeafStepExecutor",
                StepType::Sequential => "SequentialStepExecutor",
                StepType::Parallel => "ParallelStepExecutor",
            };
            assert!(debug.starts_with(type_name), "{debug}");
        }

        assert_eq!(ctx.registry().len(), 3);
    }

    #[tokio::test]
    async fn test_is_executed_tracks_execute_calls() {
        let ctx = Arc::new(ExecutionContext::new());
        let executor = create_executor(Arc::new(Step::leaf("leaf", NoOpAction)), ctx.clone());
        assert!(!executor.is_executed());

        executor.execute().unwrap();
        assert!(executor.is_executed());

        ctx.request_cancellation("stop");
        let refused = create_executor(Arc::new(Step::parallel("late", Vec::new())), ctx);
        assert!(refused.execute().is_err());
        assert!(refused.is_executed());
        assert_eq!(refused.phase(), ExecutorPhase::Refused);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(ExecutorPhase::Refused.to_string(), "refused");
        assert_eq!(
            serde_json::to_string(&ExecutorPhase::Running).unwrap(),
            r#""running""#
        );
    }
}
