//! Error types for the planflow executors.
//!
//! Child step failures are not errors: they are carried as data in the
//! [`CompletionStatus`](crate::core::CompletionStatus) tree. The variants
//! here cover cancellation observed at a launch boundary, contract
//! violations by callers, and plan construction problems.

use crate::core::StepId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type PlanflowResult<T> = Result<T, PlanflowError>;

/// The main error type for planflow operations.
#[derive(Debug, Clone, Error)]
pub enum PlanflowError {
    /// The run was cancelled before the operation could start new work.
    #[error("Plan execution cancelled: {0}")]
    Cancelled(String),

    /// An executor operation was invoked out of order.
    #[error("{0}")]
    IllegalCallOrder(#[from] IllegalCallOrderError),

    /// A plan failed validation.
    #[error("{0}")]
    Validation(#[from] PlanValidationError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlanflowError {
    /// Returns true if this error is a cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Executor operation names used in [`IllegalCallOrderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorOperation {
    /// `execute()`
    Execute,
    /// `wait_for_completion()`
    WaitForCompletion,
}

impl std::fmt::Display for ExecutorOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execute => write!(f, "execute"),
            Self::WaitForCompletion => write!(f, "wait_for_completion"),
        }
    }
}

/// Raised when an executor is driven in the wrong order, e.g. waiting on a
/// step that was never executed, or executing the same step twice.
#[derive(Debug, Clone, Error)]
#[error("Illegal call order on step '{step_name}' ({step_id}): {operation} {reason}")]
pub struct IllegalCallOrderError {
    /// The step the executor is bound to.
    pub step_id: StepId,
    /// The step display name.
    pub step_name: String,
    /// The operation that was refused.
    pub operation: ExecutorOperation,
    /// Why it was refused.
    pub reason: String,
}

impl IllegalCallOrderError {
    /// Creates a new illegal call order error.
    #[must_use]
    pub fn new(
        step_id: StepId,
        step_name: impl Into<String>,
        operation: ExecutorOperation,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            step_id,
            step_name: step_name.into(),
            operation,
            reason: reason.into(),
        }
    }
}

/// Error raised when plan validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlanValidationError {
    /// The error message.
    pub message: String,
    /// The steps involved in the error.
    pub steps: Vec<StepId>,
    /// Additional context key-value pairs.
    pub context: HashMap<String, String>,
}

impl PlanValidationError {
    /// Creates a new plan validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            steps: Vec::new(),
            context: HashMap::new(),
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<StepId>) -> Self {
        self.steps = steps;
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::Value::String(self.message.clone()));
        map.insert(
            "steps".to_string(),
            serde_json::Value::Array(
                self.steps
                    .iter()
                    .map(|s| serde_json::Value::String(s.to_string()))
                    .collect(),
            ),
        );
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_display() {
        let err = PlanflowError::Cancelled("operator abort".to_string());
        assert_eq!(err.to_string(), "Plan execution cancelled: operator abort");
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_illegal_call_order_display() {
        let id = StepId::new();
        let err: PlanflowError = IllegalCallOrderError::new(
            id,
            "deploy",
            ExecutorOperation::WaitForCompletion,
            "called before execute",
        )
        .into();

        let msg = err.to_string();
        assert!(msg.contains("deploy"));
        assert!(msg.contains("wait_for_completion called before execute"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_validation_error_to_dict() {
        let id = StepId::new();
        let err = PlanValidationError::new("Duplicate step id")
            .with_steps(vec![id])
            .with_context_entry("plan", "rollout");

        let dict = err.to_dict();
        assert_eq!(dict["message"], serde_json::json!("Duplicate step id"));
        assert_eq!(dict["steps"], serde_json::json!([id.to_string()]));
        assert_eq!(dict["context"]["plan"], serde_json::json!("rollout"));
    }
}
