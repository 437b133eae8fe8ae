//! Tracing subscriber setup and span attributes for plan runs.
//!
//! Executors log through the `tracing` macros; this module installs the
//! subscriber that renders them and flattens statuses into attributes that
//! OpenTelemetry-style exporters can attach to spans.

use crate::config::LogConfig;
use crate::core::CompletionStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Error raised when the global subscriber cannot be installed.
#[derive(Debug, Error)]
pub enum TracingInitError {
    /// The fallback level is not a valid filter directive.
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// The rejected filter.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber was already set.
    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `config.level` is used as the
/// filter. With `config.json` every event is written as one JSON line.
pub fn init_tracing(config: &LogConfig) -> Result<(), TracingInitError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            TracingInitError::InvalidFilter {
                filter: config.level.clone(),
                message: err.to_string(),
            }
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| TracingInitError::Install(err.to_string()))
}

/// Span attributes for a plan run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Plan name.
    pub plan_name: Option<String>,
    /// Run ID.
    pub run_id: Option<String>,
    /// Final state of the root step.
    pub state: Option<String>,
    /// Number of steps in the plan.
    pub step_count: Option<usize>,
}

impl RunSpanAttributes {
    /// Creates new run span attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plan name.
    #[must_use]
    pub fn with_plan_name(mut self, name: impl Into<String>) -> Self {
        self.plan_name = Some(name.into());
        self
    }

    /// Sets the run ID.
    #[must_use]
    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    /// Takes the state and size from the root status.
    #[must_use]
    pub fn with_root_status(mut self, status: &CompletionStatus) -> Self {
        self.state = Some(status.state.to_string());
        self.step_count = Some(count_steps(status));
        self
    }

    /// Converts to OpenTelemetry attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        if let Some(ref v) = self.plan_name {
            attrs.insert("plan.name".to_string(), v.clone());
        }
        if let Some(ref v) = self.run_id {
            attrs.insert("plan.run_id".to_string(), v.clone());
        }
        if let Some(ref v) = self.state {
            attrs.insert("plan.state".to_string(), v.clone());
        }
        if let Some(v) = self.step_count {
            attrs.insert("plan.step_count".to_string(), v.to_string());
        }

        attrs
    }
}

fn count_steps(status: &CompletionStatus) -> usize {
    1 + status.children.iter().map(count_steps).sum::<usize>()
}

/// Span attributes for one step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepSpanAttributes {
    /// Step name.
    pub step_name: String,
    /// Step ID.
    pub step_id: String,
    /// Step type.
    pub step_type: String,
    /// Terminal state.
    pub state: String,
    /// Duration in milliseconds, if the step ran.
    pub duration_ms: Option<i64>,
    /// Error or cancel reason.
    pub message: Option<String>,
    /// Number of direct children.
    pub child_count: usize,
}

impl StepSpanAttributes {
    /// Builds the attributes of a single status node.
    #[must_use]
    pub fn from_status(status: &CompletionStatus) -> Self {
        Self {
            step_name: status.step_name.clone(),
            step_id: status.step_id.to_string(),
            step_type: status.step_type.to_string(),
            state: status.state.to_string(),
            duration_ms: status.duration_ms(),
            message: status.message.clone(),
            child_count: status.children.len(),
        }
    }

    /// Builds attributes for every node of a status tree, in pre-order.
    #[must_use]
    pub fn collect(status: &CompletionStatus) -> Vec<Self> {
        let mut out = vec![Self::from_status(status)];
        for child in &status.children {
            out.extend(Self::collect(child));
        }
        out
    }

    /// Converts to OpenTelemetry attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("step.name".to_string(), self.step_name.clone());
        attrs.insert("step.id".to_string(), self.step_id.clone());
        attrs.insert("step.type".to_string(), self.step_type.clone());
        attrs.insert("step.state".to_string(), self.state.clone());

        if let Some(v) = self.duration_ms {
            attrs.insert("step.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.message {
            attrs.insert("step.message".to_string(), v.clone());
        }
        if self.child_count > 0 {
            attrs.insert("step.child_count".to_string(), self.child_count.to_string());
        }

        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CompletionState;
    use crate::plan::Step;
    use crate::testing::NoOpAction;
    use crate::utils::now_utc;

    fn tree() -> CompletionStatus {
        let a = Step::leaf("a", NoOpAction);
        let b = Step::leaf("b", NoOpAction);
        let root = Step::parallel("root", vec![a.clone(), b.clone()]);
        let now = now_utc();
        CompletionStatus::composite(
            &root,
            Some(now),
            now,
            vec![
                CompletionStatus::leaf(&a, CompletionState::Completed, now, now),
                CompletionStatus::not_started(&b, "not started: run cancelled"),
            ],
        )
    }

    #[test]
    fn test_step_attributes() {
        let status = tree();
        let attrs = StepSpanAttributes::from_status(&status).to_otel_attributes();

        assert_eq!(attrs["step.name"], "root");
        assert_eq!(attrs["step.type"], "parallel");
        assert_eq!(attrs["step.state"], "cancelled");
        assert_eq!(attrs["step.child_count"], "2");
    }

    #[test]
    fn test_collect_is_pre_order() {
        let all = StepSpanAttributes::collect(&tree());
        let names: Vec<_> = all.iter().map(|a| a.step_name.as_str()).collect();
        assert_eq!(names, ["root", "a", "b"]);
        assert!(all[2].duration_ms.is_none());
        assert_eq!(
            all[2].to_otel_attributes()["step.message"],
            "not started: run cancelled"
        );
    }

    #[test]
    fn test_run_attributes() {
        let attrs = RunSpanAttributes::new()
            .with_plan_name("rollout")
            .with_run_id("run-1")
            .with_root_status(&tree())
            .to_otel_attributes();

        assert_eq!(attrs["plan.name"], "rollout");
        assert_eq!(attrs["plan.state"], "cancelled");
        assert_eq!(attrs["plan.step_count"], "3");
    }

    #[test]
    fn test_init_tracing_installs_once() {
        let first = init_tracing(&LogConfig::default().with_level("planflow=debug"));
        let second = init_tracing(&LogConfig::default());
        assert!(first.is_err() || matches!(second, Err(TracingInitError::Install(_))));
    }
}
