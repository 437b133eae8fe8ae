//! Fan-out/fan-in executor.

use super::composite::CompositeChildren;
use super::state::ExecutorState;
use super::{ExecutorId, ExecutorPhase, StepExecutor};
use crate::context::ExecutionContext;
use crate::core::{CompletionStatus, StepId};
use crate::errors::PlanflowResult;
use crate::plan::Step;
use crate::utils::now_utc;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Launches every child in order, then joins them in the same order.
///
/// `execute()` only launches; all joining happens in
/// `wait_for_completion()`. Children are therefore in flight together and
/// the step takes roughly as long as its slowest child.
#[derive(Debug)]
pub struct ParallelStepExecutor {
    state: ExecutorState,
    children: CompositeChildren,
    skipped: Mutex<Vec<CompletionStatus>>,
}

impl ParallelStepExecutor {
    /// Creates a parallel executor.
    pub fn new(id: ExecutorId, step: Arc<Step>, context: Arc<ExecutionContext>) -> Self {
        let children = CompositeChildren::new(Arc::clone(&step), Arc::clone(&context));
        Self {
            state: ExecutorState::new(id, step, context),
            children,
            skipped: Mutex::new(Vec::new()),
        }
    }

    async fn join_all(&self) -> PlanflowResult<CompletionStatus> {
        if let Some(status) = self.state.check_waitable()? {
            return Ok(self.state.finish(status));
        }

        let launched = self.children.executors();
        let mut statuses = Vec::with_capacity(self.state.step.children().len());
        for (index, (_, executor)) in launched.iter().enumerate() {
            debug!("waiting for step {index}");
            statuses.push(self.children.join(index, executor).await);
        }
        statuses.extend(self.skipped.lock().iter().cloned());

        let status = CompletionStatus::composite(
            &self.state.step,
            self.state.started_at(),
            now_utc(),
            statuses,
        );
        Ok(self.state.finish(status))
    }
}

#[async_trait]
impl StepExecutor for ParallelStepExecutor {
    fn id(&self) -> ExecutorId {
        self.state.id
    }

    fn step(&self) -> &Arc<Step> {
        &self.state.step
    }

    fn phase(&self) -> ExecutorPhase {
        self.state.phase()
    }

    fn execute(&self) -> PlanflowResult<()> {
        self.state.begin_execute()?;

        let step = Arc::clone(&self.state.step);
        for (index, child) in step.children().iter().enumerate() {
            if self.state.context.is_cancellation_requested() {
                let reason = self.state.not_started_reason();
                debug!(
                    step = %step.name(),
                    remaining = step.children().len() - index,
                    "cancelled; not launching remaining children"
                );
                let mut skipped = self.skipped.lock();
                for (offset, rest) in step.children()[index..].iter().enumerate() {
                    skipped.push(self.children.skip(index + offset, rest, &reason));
                }
                break;
            }
            debug!("executing step {index}");
            self.children.launch(index, child);
        }
        Ok(())
    }

    async fn wait_for_completion(&self) -> PlanflowResult<CompletionStatus> {
        self.state
            .status
            .get_or_try_init(|| self.join_all())
            .await
            .cloned()
    }

    fn status(&self) -> Option<CompletionStatus> {
        self.state.status.get().cloned()
    }

    fn children(&self) -> Vec<(StepId, Arc<dyn StepExecutor>)> {
        self.children.executors()
    }
}
