//! Event sink system for observability.
//!
//! Executors report launch, join and completion boundaries through an
//! [`EventSink`]. Sinks are a side channel: they never influence control flow.

mod sink;

pub use sink::{CollectingEventSink, EventRecord, EventSink, LoggingEventSink, NoOpEventSink};

use parking_lot::RwLock;
use std::sync::Arc;

/// Event type names emitted by executors and the plan runner.
pub mod event_types {
    /// A plan run started.
    pub const RUN_STARTED: &str = "run.started";
    /// A plan run finished with a status.
    pub const RUN_COMPLETED: &str = "run.completed";
    /// Cancellation was requested for the run.
    pub const RUN_CANCEL_REQUESTED: &str = "run.cancel_requested";
    /// A child step was launched by its parent.
    pub const STEP_LAUNCHED: &str = "step.launched";
    /// A parent started waiting on a child step.
    pub const STEP_JOINING: &str = "step.joining";
    /// A step reached its terminal status.
    pub const STEP_COMPLETED: &str = "step.completed";
    /// A child step was not launched because of cancellation or fail-fast.
    pub const STEP_NOT_STARTED: &str = "step.not_started";
}

static DEFAULT_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the sink used by execution contexts created without an explicit one.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *DEFAULT_EVENT_SINK.write() = Some(sink);
}

/// Clears the default event sink.
pub fn clear_event_sink() {
    *DEFAULT_EVENT_SINK.write() = None;
}

/// Gets the default event sink.
///
/// Returns a `NoOpEventSink` if no sink is set.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    DEFAULT_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}
