//! Plan and context fixtures.

use std::sync::Arc;
use std::time::Duration;

use super::SleepAction;
use crate::context::ExecutionContext;
use crate::events::CollectingEventSink;
use crate::plan::Step;

/// Creates a fresh execution context with the default config.
#[must_use]
pub fn test_context() -> Arc<ExecutionContext> {
    Arc::new(ExecutionContext::new().with_plan_name("test-plan"))
}

/// Creates an execution context recording every event.
#[must_use]
pub fn collecting_context() -> (Arc<ExecutionContext>, Arc<CollectingEventSink>) {
    let sink = Arc::new(CollectingEventSink::new());
    let context = ExecutionContext::new()
        .with_plan_name("test-plan")
        .with_event_sink(sink.clone());
    (Arc::new(context), sink)
}

/// Builds a parallel step with `width` sleeping leaves named `leaf-0`..
#[must_use]
pub fn fan_out(name: &str, width: usize, delay: Duration) -> Step {
    Step::parallel(
        name,
        (0..width)
            .map(|i| Step::leaf(format!("leaf-{i}"), SleepAction::new(delay)))
            .collect(),
    )
}
