//! The context handed to leaf actions.

use super::ExecutionContext;
use crate::core::StepId;
use crate::plan::Step;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// What a leaf action can see of its run.
#[derive(Debug, Clone)]
pub struct StepContext {
    context: Arc<ExecutionContext>,
    step: Arc<Step>,
}

impl StepContext {
    /// Creates a step context.
    #[must_use]
    pub fn new(context: Arc<ExecutionContext>, step: Arc<Step>) -> Self {
        Self { context, step }
    }

    /// Returns the step id.
    #[must_use]
    pub fn step_id(&self) -> StepId {
        self.step.id()
    }

    /// Returns the step name.
    #[must_use]
    pub fn step_name(&self) -> &str {
        self.step.name()
    }

    /// Returns the step metadata.
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        self.step.metadata()
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.context.run_id()
    }

    /// Returns whether the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancellation_requested()
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<String> {
        self.context.cancel_reason()
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.context.cancelled().await;
    }

    /// Emits a custom event tagged with this step.
    pub fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut payload = serde_json::json!({
            "step_id": self.step.id().to_string(),
            "step": self.step.name(),
        });
        if let Some(data) = data {
            payload["data"] = data;
        }
        self.context.emit(event_type, Some(payload));
    }

    /// Returns the shared execution context.
    #[must_use]
    pub fn execution_context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }
}
