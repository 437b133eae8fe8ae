//! Executor for leaf steps.

use super::state::ExecutorState;
use super::task::TaskSlot;
use super::{ExecutorId, ExecutorPhase, StepExecutor};
use crate::context::{ExecutionContext, StepContext};
use crate::core::{CompletionState, CompletionStatus};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{ActionOutput, Step, StepAction};
use crate::utils::now_utc;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Runs a [`StepAction`] on its own tokio task.
#[derive(Debug)]
pub struct LeafStepExecutor {
    state: ExecutorState,
    action: Arc<dyn StepAction>,
    task: TaskSlot<ActionOutput>,
}

impl LeafStepExecutor {
    /// Creates a leaf executor. Use [`create_executor`](super::create_executor)
    /// to get it registered.
    pub fn new(
        id: ExecutorId,
        step: Arc<Step>,
        action: Arc<dyn StepAction>,
        context: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            state: ExecutorState::new(id, step, context),
            action,
            task: TaskSlot::new(),
        }
    }

    async fn join(&self) -> PlanflowResult<CompletionStatus> {
        if let Some(status) = self.state.check_waitable()? {
            return Ok(self.state.finish(status));
        }

        let step = &self.state.step;
        let started_at = self.state.started_at().unwrap_or_else(now_utc);
        let status = tokio::select! {
            biased;
            joined = self.task.join() => match joined {
                None => {
                    return Err(PlanflowError::Internal(format!(
                        "leaf step '{}' has no running task",
                        step.name()
                    )));
                }
                Some(Ok(output)) => {
                    let mut status =
                        CompletionStatus::leaf(step, output.state, started_at, now_utc())
                            .with_output(output.data);
                    status.message = output.message;
                    status
                }
                Some(Err(join_error)) => {
                    warn!(step = %step.name(), error = %join_error, "leaf task did not complete");
                    CompletionStatus::leaf(step, CompletionState::Failed, started_at, now_utc())
                    .with_message(format!("leaf task aborted: {join_error}"))
                }
            },
            () = self.state.context.cancelled() => {
                CompletionStatus::interrupted(step, Some(started_at), self.state.interrupted_reason())
            }
        };

        Ok(self.state.finish(status))
    }
}

#[async_trait]
impl StepExecutor for LeafStepExecutor {
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
        let mut slot = self.task.lock();
        self.state.begin_execute()?;

        let action = Arc::clone(&self.action);
        let ctx = StepContext::new(Arc::clone(&self.state.context), Arc::clone(&self.state.step));
        *slot = Some(tokio::spawn(async move { action.run(&ctx).await }));
        Ok(())
    }

    async fn wait_for_completion(&self) -> PlanflowResult<CompletionStatus> {
        self.state
            .status
            .get_or_try_init(|| self.join())
            .await
            .cloned()
    }

    fn status(&self) -> Option<CompletionStatus> {
        self.state.status.get().cloned()
    }
}
