//! Test assertions for completion statuses.

use crate::core::{CompletionState, CompletionStatus};

/// Asserts that the status is `Completed`.
pub fn assert_completed(status: &CompletionStatus) {
    assert!(
        status.is_completed(),
        "Expected step '{}' to complete, got {:?} ({:?})",
        status.step_name,
        status.state,
        status.message
    );
}

/// Asserts that the status is `Failed`.
pub fn assert_failed(status: &CompletionStatus) {
    assert!(
        status.is_failed(),
        "Expected step '{}' to fail, got {:?}",
        status.step_name,
        status.state
    );
}

/// Asserts that the status is `Cancelled`.
pub fn assert_cancelled(status: &CompletionStatus) {
    assert!(
        status.is_cancelled(),
        "Expected step '{}' to be cancelled, got {:?}",
        status.step_name,
        status.state
    );
}

/// Asserts that the step and its whole subtree were never launched.
pub fn assert_not_started(status: &CompletionStatus) {
    assert_cancelled(status);
    assert!(
        !status.was_started(),
        "Expected step '{}' not to have started",
        status.step_name
    );
    for child in &status.children {
        assert_not_started(child);
    }
}

/// Asserts the names of the direct children, in order.
pub fn assert_child_order(status: &CompletionStatus, expected: &[&str]) {
    let names: Vec<&str> = status.children.iter().map(|c| c.step_name.as_str()).collect();
    assert_eq!(
        names, expected,
        "Unexpected child order for step '{}'",
        status.step_name
    );
}

/// Asserts the states of the direct children, in order.
pub fn assert_child_states(status: &CompletionStatus, expected: &[CompletionState]) {
    assert_eq!(
        status.child_states(),
        expected,
        "Unexpected child states for step '{}'",
        status.step_name
    );
}
