//! Executor running children one after another.

use super::composite::CompositeChildren;
use super::state::ExecutorState;
use super::task::TaskSlot;
use super::{ExecutorId, ExecutorPhase, StepExecutor};
use crate::config::FailureMode;
use crate::context::ExecutionContext;
use crate::core::{CompletionState, CompletionStatus, StepId};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::Step;
use crate::utils::now_utc;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
struct SequentialInner {
    state: ExecutorState,
    children: CompositeChildren,
}

impl SequentialInner {
    /// Launches and joins each child before moving to the next.
    async fn run_children(self: Arc<Self>) -> Vec<CompletionStatus> {
        let step = Arc::clone(&self.state.step);
        let failure_mode = self.state.context.config().failure_mode;
        let mut statuses = Vec::with_capacity(step.children().len());
        let mut stop_reason: Option<String> = None;

        for (index, child) in step.children().iter().enumerate() {
            if stop_reason.is_none() && self.state.context.is_cancellation_requested() {
                stop_reason = Some(self.state.not_started_reason());
            }
            if let Some(reason) = &stop_reason {
                statuses.push(self.children.skip(index, child, reason));
                continue;
            }

            debug!("executing step {index}");
            let executor = self.children.launch(index, child);
            let status = self.children.join(index, &executor).await;

            if failure_mode == FailureMode::FailFast && !status.is_completed() {
                debug!(
                    step = %step.name(),
                    child = %child.name(),
                    state = %status.state,
                    "stopping sequence"
                );
                stop_reason = Some(format!(
                    "not started: step '{}' {}",
                    child.name(),
                    status.state
                ));
            }
            statuses.push(status);
        }

        statuses
    }
}

/// Runs children in declaration order, each one finishing before the next
/// starts.
///
/// `execute()` hands the loop to a tokio task and returns immediately. With
/// [`FailureMode::FailFast`] the first child that does not complete stops the
/// sequence; the rest are reported as not started.
#[derive(Debug)]
pub struct SequentialStepExecutor {
    inner: Arc<SequentialInner>,
    task: TaskSlot<Vec<CompletionStatus>>,
}

impl SequentialStepExecutor {
    /// Creates a sequential executor.
    pub fn new(id: ExecutorId, step: Arc<Step>, context: Arc<ExecutionContext>) -> Self {
        let children = CompositeChildren::new(Arc::clone(&step), Arc::clone(&context));
        Self {
            inner: Arc::new(SequentialInner {
                state: ExecutorState::new(id, step, context),
                children,
            }),
            task: TaskSlot::new(),
        }
    }

    async fn join_loop(&self) -> PlanflowResult<CompletionStatus> {
        let state = &self.inner.state;
        if let Some(status) = state.check_waitable()? {
            return Ok(state.finish(status));
        }

        let Some(joined) = self.task.join().await else {
            return Err(PlanflowError::Internal(format!(
                "sequential step '{}' has no running task",
                state.step.name()
            )));
        };

        let status = match joined {
            Ok(children) => {
                CompletionStatus::composite(&state.step, state.started_at(), now_utc(), children)
            }
            Err(join_error) => {
                warn!(step = %state.step.name(), error = %join_error, "sequence task did not complete");
                let mut status = CompletionStatus::composite(
                    &state.step,
                    state.started_at(),
                    now_utc(),
                    Vec::new(),
                )
                .with_message(format!("sequence task aborted: {join_error}"));
                status.state = CompletionState::Failed;
                status
            }
        };

        Ok(state.finish(status))
    }
}

#[async_trait]
impl StepExecutor for SequentialStepExecutor {
    fn id(&self) -> ExecutorId {
        self.inner.state.id
    }

    fn step(&self) -> &Arc<Step> {
        &self.inner.state.step
    }

    fn phase(&self) -> ExecutorPhase {
        self.inner.state.phase()
    }

    fn execute(&self) -> PlanflowResult<()> {
        let mut slot = self.task.lock();
        self.inner.state.begin_execute()?;

        *slot = Some(tokio::spawn(Arc::clone(&self.inner).run_children()));
        Ok(())
    }

    async fn wait_for_completion(&self) -> PlanflowResult<CompletionStatus> {
        self.inner
            .state
            .status
            .get_or_try_init(|| self.join_loop())
            .await
            .cloned()
    }

    fn status(&self) -> Option<CompletionStatus> {
        self.inner.state.status.get().cloned()
    }

    fn children(&self) -> Vec<(StepId, Arc<dyn StepExecutor>)> {
        self.inner.children.executors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionConfig;
    use crate::executor::create_executor;
    use crate::testing::{FailingAction, RecordingAction, SleepAction};
    use std::time::Duration;

    fn three_with_failure(journal: &RecordingAction) -> Arc<Step> {
        Arc::new(Step::sequential(
            "seq",
            vec![
                Step::leaf("first", journal.named("first")),
                Step::leaf("second", FailingAction::new("broken")),
                Step::leaf("third", journal.named("third")),
            ],
        ))
    }

    #[tokio::test]
    async fn test_children_run_in_order() {
        let journal = RecordingAction::new();
        let step = Arc::new(Step::sequential(
            "ordered",
            vec![
                Step::leaf("a", journal.named("a")),
                Step::leaf("b", journal.named("b")),
                Step::leaf("c", journal.named("c")),
            ],
        ));
        let executor = create_executor(step, Arc::new(ExecutionContext::new()));

        executor.execute().unwrap();
        let status = executor.wait_for_completion().await.unwrap();

        assert!(status.is_completed());
        assert_eq!(journal.entries(), vec!["a", "b", "c"]);
        assert_eq!(executor.children().len(), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining() {
        let journal = RecordingAction::new();
        let executor =
            create_executor(three_with_failure(&journal), Arc::new(ExecutionContext::new()));

        executor.execute().unwrap();
        let status = executor.wait_for_completion().await.unwrap();

        assert!(status.is_failed());
        assert_eq!(journal.entries(), vec!["first"]);
        let third = &status.children[2];
        assert!(third.is_cancelled());
        assert!(!third.was_started());
        assert_eq!(third.message.as_deref(), Some("not started: step 'second' failed"));
        assert_eq!(executor.children().len(), 2);
    }

    #[tokio::test]
    async fn test_continue_on_failure_runs_everything() {
        let journal = RecordingAction::new();
        let ctx = Arc::new(ExecutionContext::new().with_config(
            ExecutionConfig::new().with_failure_mode(FailureMode::ContinueOnFailure),
        ));
        let executor = create_executor(three_with_failure(&journal), ctx);

        executor.execute().unwrap();
        let status = executor.wait_for_completion().await.unwrap();

        assert!(status.is_failed());
        assert_eq!(journal.entries(), vec!["first", "third"]);
        assert_eq!(
            status.child_states(),
            vec![
                CompletionState::Completed,
                CompletionState::Failed,
                CompletionState::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_sequential_completes() {
        let executor = create_executor(
            Arc::new(Step::sequential("empty", Vec::new())),
            Arc::new(ExecutionContext::new()),
        );

        executor.execute().unwrap();
        assert!(executor.wait_for_completion().await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_wait_survives_dropped_wait() {
        let step = Arc::new(Step::sequential(
            "steps",
            vec![
                Step::leaf("one", SleepAction::with_delay_ms(40)),
                Step::leaf("two", SleepAction::with_delay_ms(40)),
            ],
        ));
        let executor = create_executor(step, Arc::new(ExecutionContext::new()));
        executor.execute().unwrap();

        let first =
            tokio::time::timeout(Duration::from_millis(10), executor.wait_for_completion()).await;
        assert!(first.is_err());

        let status = executor.wait_for_completion().await.unwrap();
        assert!(status.is_completed());
        assert_eq!(
            status.child_states(),
            vec![CompletionState::Completed, CompletionState::Completed]
        );
    }
}
