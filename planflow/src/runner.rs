//! Plan run driver.
//!
//! [`PlanRunner`] owns the outer lifecycle of a run: it creates the
//! [`ExecutionContext`], builds the root executor, calls `execute()` and
//! `wait_for_completion()` on it and reports the result.

use crate::config::ExecutionConfig;
use crate::context::ExecutionContext;
use crate::core::{CompletionState, CompletionStatus};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::events::{event_types, EventSink};
use crate::executor::create_executor;
use crate::observability::RunSpanAttributes;
use crate::plan::Plan;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Runs plans to completion.
#[derive(Clone, Default)]
pub struct PlanRunner {
    config: ExecutionConfig,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl fmt::Debug for PlanRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanRunner")
            .field("config", &self.config)
            .field("has_event_sink", &self.event_sink.is_some())
            .finish()
    }
}

impl PlanRunner {
    /// Creates a runner with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the config applied to every run.
    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink. Without one, runs use the global default sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Returns the config.
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Creates a fresh context for a run of `plan`.
    #[must_use]
    pub fn new_context(&self, plan: &Plan) -> Arc<ExecutionContext> {
        let mut context = ExecutionContext::new()
            .with_config(self.config.clone())
            .with_plan_name(plan.name());
        if let Some(sink) = &self.event_sink {
            context = context.with_event_sink(Arc::clone(sink));
        }
        Arc::new(context)
    }

    /// Runs `plan` in a fresh context and returns the root status.
    pub async fn run(&self, plan: &Plan) -> PlanflowResult<CompletionStatus> {
        self.run_with_context(plan, self.new_context(plan)).await
    }

    /// Runs `plan` in the given context.
    ///
    /// A context that is already cancelled yields a not-started status tree
    /// rather than an error.
    pub async fn run_with_context(
        &self,
        plan: &Plan,
        context: Arc<ExecutionContext>,
    ) -> PlanflowResult<CompletionStatus> {
        let start = Instant::now();
        info!(
            plan = %plan.name(),
            run_id = %context.run_id(),
            steps = plan.root().step_count(),
            "Plan run started"
        );
        context.emit(
            event_types::RUN_STARTED,
            Some(serde_json::json!({
                "run_id": context.run_id().to_string(),
                "plan": plan.name(),
                "plan_id": plan.id().to_string(),
                "steps": plan.root().step_count(),
            })),
        );

        let root = create_executor(Arc::clone(plan.root()), Arc::clone(&context));
        match root.execute() {
            Ok(()) => {}
            Err(PlanflowError::Cancelled(reason)) => {
                debug!(plan = %plan.name(), reason = %reason, "Run cancelled before the root started");
            }
            Err(err) => return Err(err),
        }

        let status = root.wait_for_completion().await?;
        debug!(executors = context.registry().len(), "Root step joined");

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let attributes = RunSpanAttributes::new()
            .with_plan_name(plan.name())
            .with_run_id(context.run_id().to_string())
            .with_root_status(&status);
        debug!(attributes = ?attributes.to_otel_attributes(), "Run span attributes");
        let counts = status.leaf_counts();
        let count = |state: CompletionState| counts.get(&state).copied().unwrap_or(0);
        info!(
            plan = %plan.name(),
            run_id = %context.run_id(),
            state = %status.state,
            duration_ms,
            "Plan run completed"
        );
        context.emit(
            event_types::RUN_COMPLETED,
            Some(serde_json::json!({
                "run_id": context.run_id().to_string(),
                "plan": plan.name(),
                "state": status.state,
                "duration_ms": duration_ms,
                "leaves_completed": count(CompletionState::Completed),
                "leaves_failed": count(CompletionState::Failed),
                "leaves_cancelled": count(CompletionState::Cancelled),
            })),
        );

        Ok(status)
    }

    /// Starts `plan` on a background task and returns a handle to it.
    #[must_use]
    pub fn start(&self, plan: &Plan) -> RunHandle {
        let context = self.new_context(plan);
        let runner = self.clone();
        let plan = plan.clone();
        let run_context = Arc::clone(&context);
        let join = tokio::spawn(async move { runner.run_with_context(&plan, run_context).await });
        RunHandle { context, join }
    }
}

/// A plan run in progress.
#[derive(Debug)]
pub struct RunHandle {
    context: Arc<ExecutionContext>,
    join: JoinHandle<PlanflowResult<CompletionStatus>>,
}

impl RunHandle {
    /// Returns the run context.
    #[must_use]
    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }

    /// Requests cancellation of the run. Returns true if this call was the
    /// first request.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        self.context.request_cancellation(reason)
    }

    /// Waits for the run to finish.
    pub async fn wait(self) -> PlanflowResult<CompletionStatus> {
        self.join
            .await
            .map_err(|err| PlanflowError::Internal(format!("plan run task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::plan::{CompositeStepBuilder, Step};
    use crate::testing::{
        assert_cancelled, assert_completed, assert_failed, assert_not_started, FailingAction,
        NoOpAction, SleepAction, WaitForCancelAction,
    };
    use std::time::Duration;

    fn rollout() -> Plan {
        CompositeStepBuilder::sequential("rollout")
            .leaf("drain", NoOpAction)
            .parallel_group("hosts", |hosts| {
                hosts
                    .leaf("host-1", SleepAction::with_delay_ms(10))
                    .leaf("host-2", SleepAction::with_delay_ms(5))
            })
            .leaf("undrain", NoOpAction)
            .build_plan()
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_completes_and_emits_run_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let runner = PlanRunner::new().with_event_sink(sink.clone());

        let status = runner.run(&rollout()).await.unwrap();

        assert_completed(&status);
        let events = sink.events();
        assert_eq!(events.first().map(|e| e.event_type.as_str()), Some(event_types::RUN_STARTED));
        assert_eq!(events.last().map(|e| e.event_type.as_str()), Some(event_types::RUN_COMPLETED));
        let completed = sink.events_of_type(event_types::RUN_COMPLETED);
        assert_eq!(completed[0].field("state"), Some("completed"));
        assert_eq!(completed[0].field("plan"), Some("rollout"));
    }

    #[tokio::test]
    async fn test_run_releases_context() {
        let runner = PlanRunner::new();
        let plan = rollout();
        let context = runner.new_context(&plan);

        runner.run_with_context(&plan, context.clone()).await.unwrap();

        assert_eq!(context.registry().len(), plan.root().step_count());
        assert!(context.registry().snapshot().is_empty());
        assert_eq!(Arc::strong_count(&context), 1);
    }

    #[tokio::test]
    async fn test_run_reports_failure_as_status() {
        let plan = Plan::new(
            "broken",
            Step::parallel("root", vec![Step::leaf("bad", FailingAction::new("boom"))]),
        )
        .unwrap();

        let status = PlanRunner::new().run(&plan).await.unwrap();
        assert_failed(&status);
    }

    #[tokio::test]
    async fn test_run_with_cancelled_context_starts_nothing() {
        let runner = PlanRunner::new();
        let plan = rollout();
        let context = runner.new_context(&plan);
        context.request_cancellation("frozen");

        let status = runner.run_with_context(&plan, context).await.unwrap();

        assert_not_started(&status);
        assert_eq!(status.leaves().len(), 4);
    }

    #[tokio::test]
    async fn test_start_and_cancel() {
        let plan = Plan::new(
            "long",
            Step::sequential(
                "root",
                vec![
                    Step::leaf("wait", WaitForCancelAction::cooperative()),
                    Step::leaf("never", NoOpAction),
                ],
            ),
        )
        .unwrap();

        let handle = PlanRunner::new().start(&plan);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.cancel("deadline"));
        assert!(!handle.cancel("again"));
        assert_eq!(handle.context().cancel_reason().as_deref(), Some("deadline"));

        let status = tokio::time::timeout(Duration::from_secs(2), handle.wait())
            .await
            .unwrap()
            .unwrap();
        assert_cancelled(&status);
        assert_not_started(&status.children[1]);
    }
}
