//! Step type and completion state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The shape of a step in the plan tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// A step that performs actual work.
    Leaf,
    /// A composite step running its children one after another.
    Sequential,
    /// A composite step running its children concurrently.
    Parallel,
}

impl StepType {
    /// Returns true for sequential and parallel steps.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        !matches!(self, Self::Leaf)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// The terminal outcome of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    /// The step and all of its children finished successfully.
    Completed,
    /// The step, or at least one of its children, failed.
    Failed,
    /// The step was cancelled or never started because of cancellation.
    Cancelled,
}

impl CompletionState {
    /// Rolls child states up into a parent state.
    ///
    /// `Failed` takes precedence over `Cancelled`, which takes precedence over
    /// `Completed`. An empty set of children is `Completed`.
    #[must_use]
    pub fn aggregate<I>(states: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        states
            .into_iter()
            .fold(Self::Completed, |acc, s| if s.rank() > acc.rank() { s } else { acc })
    }

    fn rank(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Cancelled => 1,
            Self::Failed => 2,
        }
    }

    /// Returns true if the state is `Completed`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CompletionState::{Cancelled, Completed, Failed};

    #[test]
    fn test_aggregate_empty_is_completed() {
        assert_eq!(CompletionState::aggregate([]), Completed);
    }

    #[test]
    fn test_aggregate_all_completed() {
        assert_eq!(CompletionState::aggregate([Completed, Completed]), Completed);
    }

    #[test]
    fn test_aggregate_any_failed() {
        assert_eq!(CompletionState::aggregate([Completed, Failed, Completed]), Failed);
    }

    #[test]
    fn test_aggregate_failed_beats_cancelled() {
        assert_eq!(CompletionState::aggregate([Cancelled, Failed]), Failed);
        assert_eq!(CompletionState::aggregate([Failed, Cancelled]), Failed);
    }

    #[test]
    fn test_aggregate_cancelled_beats_completed() {
        assert_eq!(CompletionState::aggregate([Completed, Cancelled]), Cancelled);
    }

    #[test]
    fn test_display() {
        assert_eq!(Completed.to_string(), "completed");
        assert_eq!(StepType::Parallel.to_string(), "parallel");
        assert!(StepType::Sequential.is_composite());
        assert!(!StepType::Leaf.is_composite());
    }

    #[test]
    fn test_state_serialize() {
        let json = serde_json::to_string(&Cancelled).unwrap();
        assert_eq!(json, r#""cancelled""#);

        let deserialized: CompletionState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, Cancelled);
    }
}
