//! Completion status trees.

use super::{CompletionState, StepId, StepType};
use crate::plan::Step;
use crate::utils::{elapsed_ms, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The terminal outcome of one step.
///
/// For composite steps `children` holds one status per child step, in the
/// order the children were declared. Completion order is never reflected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionStatus {
    /// The step this status belongs to.
    pub step_id: StepId,
    /// The step display name.
    pub step_name: String,
    /// The step type.
    pub step_type: StepType,
    /// The terminal state.
    pub state: CompletionState,
    /// When the step was launched. Absent if it never started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the step reached its terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
    /// Error or cancel reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload returned by a leaf action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Child statuses, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CompletionStatus>,
}

impl CompletionStatus {
    /// Creates the status of a leaf step.
    #[must_use]
    pub fn leaf(
        step: &Step,
        state: CompletionState,
        started_at: Timestamp,
        ended_at: Timestamp,
    ) -> Self {
        Self {
            step_id: step.id(),
            step_name: step.name().to_string(),
            step_type: step.step_type(),
            state,
            started_at: Some(started_at),
            ended_at: Some(ended_at),
            message: None,
            output: None,
            children: Vec::new(),
        }
    }

    /// Creates the status of a composite step from its ordered child statuses.
    ///
    /// The state is derived with [`CompletionState::aggregate`].
    #[must_use]
    pub fn composite(
        step: &Step,
        started_at: Option<Timestamp>,
        ended_at: Timestamp,
        children: Vec<Self>,
    ) -> Self {
        let state = CompletionState::aggregate(children.iter().map(|c| c.state));
        Self {
            step_id: step.id(),
            step_name: step.name().to_string(),
            step_type: step.step_type(),
            state,
            started_at,
            ended_at: Some(ended_at),
            message: None,
            output: None,
            children,
        }
    }

    /// Creates a `Cancelled` status for a step that was launched but whose
    /// wait was interrupted by cancellation.
    #[must_use]
    pub fn interrupted(step: &Step, started_at: Option<Timestamp>, reason: impl Into<String>) -> Self {
        Self {
            step_id: step.id(),
            step_name: step.name().to_string(),
            step_type: step.step_type(),
            state: CompletionState::Cancelled,
            started_at,
            ended_at: Some(now_utc()),
            message: Some(reason.into()),
            output: None,
            children: Vec::new(),
        }
    }

    /// Creates a `Cancelled` status for a step that was never launched.
    ///
    /// Composite steps get one not-started child status per declared child
    /// so the status tree keeps the shape of the plan.
    #[must_use]
    pub fn not_started(step: &Step, reason: &str) -> Self {
        Self {
            step_id: step.id(),
            step_name: step.name().to_string(),
            step_type: step.step_type(),
            state: CompletionState::Cancelled,
            started_at: None,
            ended_at: None,
            message: Some(reason.to_string()),
            output: None,
            children: step
                .children()
                .iter()
                .map(|child| Self::not_started(child, reason))
                .collect(),
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the leaf output payload.
    #[must_use]
    pub fn with_output(mut self, output: Option<serde_json::Value>) -> Self {
        self.output = output;
        self
    }

    /// Returns true if the state is `Completed`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == CompletionState::Completed
    }

    /// Returns true if the state is `Failed`.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state == CompletionState::Failed
    }

    /// Returns true if the state is `Cancelled`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state == CompletionState::Cancelled
    }

    /// Returns true if the step was actually launched.
    #[must_use]
    pub fn was_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Returns the elapsed time in milliseconds, if both bounds are known.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(elapsed_ms(&start, &end)),
            _ => None,
        }
    }

    /// Returns the child status at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Self> {
        self.children.get(index)
    }

    /// Returns the states of the direct children, in declaration order.
    #[must_use]
    pub fn child_states(&self) -> Vec<CompletionState> {
        self.children.iter().map(|c| c.state).collect()
    }

    /// Finds the status of a step anywhere in this tree.
    #[must_use]
    pub fn find(&self, step_id: StepId) -> Option<&Self> {
        if self.step_id == step_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(step_id))
    }

    /// Returns all leaf statuses in pre-order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Self>) {
        if self.step_type == StepType::Leaf {
            out.push(self);
        } else {
            for child in &self.children {
                child.collect_leaves(out);
            }
        }
    }

    /// Counts leaf statuses by state.
    #[must_use]
    pub fn leaf_counts(&self) -> HashMap<CompletionState, usize> {
        let mut counts = HashMap::new();
        for leaf in self.leaves() {
            *counts.entry(leaf.state).or_insert(0) += 1;
        }
        counts
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
