//! The per-run execution context.

use crate::cancellation::CancellationToken;
use crate::config::ExecutionConfig;
use crate::events::{event_types, get_event_sink, EventSink};
use crate::executor::ExecutorRegistry;
use crate::utils::iso_timestamp;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// State shared by every executor of one plan run.
///
/// Created by the run driver and passed as `Arc<ExecutionContext>` into every
/// executor creation, so a cancellation request is visible to already running
/// executors and to children spawned afterwards alike.
pub struct ExecutionContext {
    /// Run identifier.
    run_id: Uuid,
    /// Name of the plan being run, for logs and events.
    plan_name: Option<String>,
    /// Run-scoped cancellation signal.
    cancellation: CancellationToken,
    /// Arena of every executor created during the run.
    registry: ExecutorRegistry,
    /// Sink for launch/join/completion events.
    event_sink: Arc<dyn EventSink>,
    /// Execution settings.
    config: ExecutionConfig,
}

impl ExecutionContext {
    /// Creates a context with the default config and the default event sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: crate::utils::generate_uuid_v7(),
            plan_name: None,
            cancellation: CancellationToken::new(),
            registry: ExecutorRegistry::new(),
            event_sink: get_event_sink(),
            config: ExecutionConfig::default(),
        }
    }

    /// Sets the execution config.
    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the plan name.
    #[must_use]
    pub fn with_plan_name(mut self, name: impl Into<String>) -> Self {
        self.plan_name = Some(name.into());
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the plan name, if set.
    #[must_use]
    pub fn plan_name(&self) -> Option<&str> {
        self.plan_name.as_deref()
    }

    /// Returns the execution config.
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Returns the executor registry for introspection.
    #[must_use]
    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Requests cancellation of the whole run.
    ///
    /// Idempotent; the first reason wins. Returns true if this call performed
    /// the transition.
    pub fn request_cancellation(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let transitioned = self.cancellation.cancel(reason.clone());
        if transitioned {
            info!(run_id = %self.run_id, reason = %reason, "Cancellation requested");
            self.emit(
                event_types::RUN_CANCEL_REQUESTED,
                Some(serde_json::json!({
                    "run_id": self.run_id.to_string(),
                    "reason": reason,
                })),
            );
        }
        transitioned
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<String> {
        self.cancellation.reason()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Forwards an event to the sink.
    ///
    /// Disabled by config, a no-op. Object payloads get a `timestamp` field.
    /// A panicking sink is logged and ignored.
    pub fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        if !self.config.emit_events {
            return;
        }
        let data = data.map(|mut payload| {
            if let Some(fields) = payload.as_object_mut() {
                fields
                    .entry("timestamp")
                    .or_insert_with(|| serde_json::Value::String(iso_timestamp()));
            }
            payload
        });
        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_sink.try_emit(event_type, data);
        }))
        .is_err()
        {
            warn!(event_type = %event_type, "Event sink panicked; event dropped");
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("plan_name", &self.plan_name)
            .field("cancelled", &self.is_cancellation_requested())
            .field("executors", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct PanickingSink;

    #[async_trait]
    impl EventSink for PanickingSink {
        async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}

        fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {
            panic!("sink exploded");
        }
    }

    #[test]
    fn test_request_cancellation_is_idempotent() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = ExecutionContext::new().with_event_sink(sink.clone());

        assert!(!ctx.is_cancellation_requested());
        assert!(ctx.request_cancellation("operator"));
        assert!(!ctx.request_cancellation("again"));

        assert!(ctx.is_cancellation_requested());
        assert_eq!(ctx.cancel_reason().as_deref(), Some("operator"));
        let requested = sink.events_of_type(event_types::RUN_CANCEL_REQUESTED);
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].field("reason"), Some("operator"));
        assert!(requested[0].field("timestamp").is_some());
    }

    #[test]
    fn test_emit_respects_config() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = ExecutionContext::new()
            .with_event_sink(sink.clone())
            .with_config(ExecutionConfig::new().with_emit_events(false));

        ctx.emit(event_types::STEP_LAUNCHED, None);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_panicking_sink_does_not_escape() {
        let ctx = ExecutionContext::new().with_event_sink(Arc::new(PanickingSink));
        ctx.emit(event_types::STEP_LAUNCHED, None);
        assert!(ctx.request_cancellation("still works"));
    }

    #[test]
    fn test_debug_output() {
        let ctx = ExecutionContext::new().with_plan_name("nightly");
        let debug = format!("{ctx:?}");
        assert!(debug.contains("nightly"));
        assert!(debug.contains("cancelled: false"));
    }
}
