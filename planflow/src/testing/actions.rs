//! Leaf actions for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::context::StepContext;
use crate::plan::{ActionOutput, StepAction};

/// An action that completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAction;

#[async_trait]
impl StepAction for NoOpAction {
    async fn run(&self, _ctx: &StepContext) -> ActionOutput {
        ActionOutput::ok()
    }
}

/// An action that takes time to complete.
///
/// Stops early with a cancelled output if the run is cancelled while it
/// sleeps.
#[derive(Debug, Clone, Copy)]
pub struct SleepAction {
    delay: Duration,
}

impl SleepAction {
    /// Creates a new sleeping action.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Creates a sleeping action with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl StepAction for SleepAction {
    async fn run(&self, ctx: &StepContext) -> ActionOutput {
        tokio::select! {
            () = tokio::time::sleep(self.delay) => ActionOutput::ok(),
            () = ctx.cancelled() => ActionOutput::cancel(
                ctx.cancel_reason().unwrap_or_else(|| "cancelled".to_string()),
            ),
        }
    }
}

/// An action that always fails.
#[derive(Debug, Clone)]
pub struct FailingAction {
    error: String,
}

impl FailingAction {
    /// Creates a new failing action.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[async_trait]
impl StepAction for FailingAction {
    async fn run(&self, _ctx: &StepContext) -> ActionOutput {
        ActionOutput::fail(self.error.clone())
    }
}

/// An action that counts its invocations. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct CountingAction {
    calls: Arc<AtomicUsize>,
}

impl CountingAction {
    /// Creates a new counting action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times the action ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepAction for CountingAction {
    async fn run(&self, _ctx: &StepContext) -> ActionOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ActionOutput::ok()
    }
}

/// An action that appends its label to a shared journal when it finishes.
///
/// Actions derived with [`RecordingAction::named`] write to the same
/// journal, so the journal shows the order in which leaves completed.
#[derive(Debug, Clone)]
pub struct RecordingAction {
    label: String,
    delay: Duration,
    journal: Arc<Mutex<Vec<String>>>,
}

impl Default for RecordingAction {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingAction {
    /// Creates a recording action with an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: "recording".to_string(),
            delay: Duration::ZERO,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns an action with another label writing to the same journal.
    #[must_use]
    pub fn named(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            delay: Duration::ZERO,
            journal: Arc::clone(&self.journal),
        }
    }

    /// Sleeps for `delay` before recording.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the journal in completion order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    /// Clears the journal.
    pub fn clear(&self) {
        self.journal.lock().clear();
    }
}

#[async_trait]
impl StepAction for RecordingAction {
    async fn run(&self, ctx: &StepContext) -> ActionOutput {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.journal.lock().push(self.label.clone());
        ActionOutput::ok_value(serde_json::json!({ "step": ctx.step_name() }))
    }
}

/// An action that panics.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingAction;

#[async_trait]
impl StepAction for PanickingAction {
    async fn run(&self, ctx: &StepContext) -> ActionOutput {
        panic!("action for step '{}' panicked", ctx.step_name())
    }
}

/// An action that only returns once the run is cancelled, or never.
#[derive(Debug, Clone, Copy)]
pub struct WaitForCancelAction {
    cooperative: bool,
}

impl WaitForCancelAction {
    /// Returns a cancelled output as soon as the run is cancelled.
    #[must_use]
    pub fn cooperative() -> Self {
        Self { cooperative: true }
    }

    /// Never returns, even after cancellation.
    #[must_use]
    pub fn ignoring() -> Self {
        Self { cooperative: false }
    }
}

#[async_trait]
impl StepAction for WaitForCancelAction {
    async fn run(&self, ctx: &StepContext) -> ActionOutput {
        if self.cooperative {
            ctx.cancelled().await;
            return ActionOutput::cancel(
                ctx.cancel_reason().unwrap_or_else(|| "cancelled".to_string()),
            );
        }
        std::future::pending::<ActionOutput>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::core::CompletionState;
    use crate::plan::Step;

    fn step_context(action: impl StepAction + 'static) -> StepContext {
        StepContext::new(
            Arc::new(ExecutionContext::new()),
            Arc::new(Step::leaf("test", action)),
        )
    }

    #[tokio::test]
    async fn test_counting_action_shares_counter() {
        let action = CountingAction::new();
        let ctx = step_context(action.clone());
        action.run(&ctx).await;
        action.clone().run(&ctx).await;
        assert_eq!(action.calls(), 2);
    }

    #[tokio::test]
    async fn test_recording_action_shares_journal() {
        let journal = RecordingAction::new();
        let ctx = step_context(NoOpAction);
        journal.named("a").run(&ctx).await;
        journal.named("b").run(&ctx).await;
        assert_eq!(journal.entries(), vec!["a", "b"]);

        journal.clear();
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_sleep_action_stops_on_cancel() {
        let ctx = step_context(NoOpAction);
        ctx.execution_context().request_cancellation("stop");
        let output = SleepAction::with_delay_ms(10_000).run(&ctx).await;
        assert_eq!(output.state, CompletionState::Cancelled);
        assert_eq!(output.message.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_failing_action() {
        let output = FailingAction::new("bad input").run(&step_context(NoOpAction)).await;
        assert_eq!(output.state, CompletionState::Failed);
        assert_eq!(output.message.as_deref(), Some("bad input"));
    }
}
