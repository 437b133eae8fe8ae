//! Testing utilities for planflow plans.
//!
//! This module provides:
//! - Leaf actions with predictable behavior
//! - Assertions over completion status trees
//! - Plan and context fixtures

mod actions;
mod assertions;
mod fixtures;

pub use actions::{
    CountingAction, FailingAction, NoOpAction, PanickingAction, RecordingAction, SleepAction,
    WaitForCancelAction,
};
pub use assertions::{
    assert_cancelled, assert_child_order, assert_child_states, assert_completed, assert_failed,
    assert_not_started,
};
pub use fixtures::{collecting_context, fan_out, test_context};
