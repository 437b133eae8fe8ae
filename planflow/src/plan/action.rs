//! The leaf work seam.

use crate::context::StepContext;
use crate::core::CompletionState;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Work performed by a leaf step.
///
/// Implementations are supplied by the surrounding framework. They run on
/// their own tokio task and should poll [`StepContext::is_cancelled`] or
/// await [`StepContext::cancelled`] to stop early when the run is cancelled.
#[async_trait]
pub trait StepAction: Send + Sync + Debug {
    /// Performs the work and reports its outcome.
    async fn run(&self, ctx: &StepContext) -> ActionOutput;
}

/// The outcome reported by a [`StepAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// The terminal state of the leaf.
    pub state: CompletionState,
    /// Error or cancel reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Optional payload surfaced in the leaf's completion status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Default for ActionOutput {
    fn default() -> Self {
        Self::ok()
    }
}

impl ActionOutput {
    /// Creates a successful output with no data.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            state: CompletionState::Completed,
            message: None,
            data: None,
        }
    }

    /// Creates a successful output carrying a payload.
    #[must_use]
    pub fn ok_value(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    /// Creates a failure output with an error message.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            state: CompletionState::Failed,
            message: Some(error.into()),
            data: None,
        }
    }

    /// Creates a cancel output with a reason.
    #[must_use]
    pub fn cancel(reason: impl Into<String>) -> Self {
        Self {
            state: CompletionState::Cancelled,
            message: Some(reason.into()),
            data: None,
        }
    }

    /// Returns true if the action completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

/// An action backed by an async closure.
pub struct FnAction<F>
where
    F: Fn(StepContext) -> BoxFuture<'static, ActionOutput> + Send + Sync,
{
    label: String,
    func: F,
}

impl<F> FnAction<F>
where
    F: Fn(StepContext) -> BoxFuture<'static, ActionOutput> + Send + Sync,
{
    /// Creates a new closure-backed action.
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> Debug for FnAction<F>
where
    F: Fn(StepContext) -> BoxFuture<'static, ActionOutput> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAction").field("label", &self.label).finish()
    }
}

#[async_trait]
impl<F> StepAction for FnAction<F>
where
    F: Fn(StepContext) -> BoxFuture<'static, ActionOutput> + Send + Sync,
{
    async fn run(&self, ctx: &StepContext) -> ActionOutput {
        (self.func)(ctx.clone()).await
    }
}
