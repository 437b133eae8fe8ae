//! Configuration types for plan runs and logging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the sequential failure mode.
pub const ENV_FAILURE_MODE: &str = "PLANFLOW_FAILURE_MODE";
/// Environment variable toggling event emission.
pub const ENV_EMIT_EVENTS: &str = "PLANFLOW_EMIT_EVENTS";
/// Environment variable with the fallback log level.
pub const ENV_LOG_LEVEL: &str = "PLANFLOW_LOG_LEVEL";
/// Environment variable switching log output to JSON.
pub const ENV_LOG_JSON: &str = "PLANFLOW_LOG_JSON";

/// Error raised when a configuration value cannot be parsed.
#[derive(Debug, Clone, Error)]
#[error("Invalid value '{value}' for {key}")]
pub struct ConfigError {
    /// The configuration key.
    pub key: String,
    /// The rejected value.
    pub value: String,
}

/// How a sequential step reacts to a child that did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop at the first failed or cancelled child (default).
    #[default]
    FailFast,
    /// Run every child regardless of earlier failures.
    ///
    /// Cancellation of the run still stops the sequence.
    ContinueOnFailure,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail_fast"),
            Self::ContinueOnFailure => write!(f, "continue_on_failure"),
        }
    }
}

impl FromStr for FailureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "fail-fast" => Ok(Self::FailFast),
            "continue_on_failure" | "continue-on-failure" | "continue" => {
                Ok(Self::ContinueOnFailure)
            }
            _ => Err(ConfigError {
                key: ENV_FAILURE_MODE.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Settings shared by every executor of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Policy for sequential steps when a child fails or is cancelled.
    #[serde(default)]
    pub failure_mode: FailureMode,
    /// Whether executors forward launch/join/completion events to the sink.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_emit_events() -> bool {
    true
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::default(),
            emit_events: default_emit_events(),
        }
    }
}

impl ExecutionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub fn with_emit_events(mut self, emit: bool) -> Self {
        self.emit_events = emit;
        self
    }

    /// Loads configuration from `PLANFLOW_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(mode) = lookup(ENV_FAILURE_MODE) {
            config.failure_mode = mode.parse()?;
        }
        if let Some(emit) = lookup(ENV_EMIT_EVENTS) {
            config.emit_events = parse_bool(ENV_EMIT_EVENTS, &emit)?;
        }
        Ok(config)
    }
}

/// Settings for the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Sets the fallback level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Loads configuration from `PLANFLOW_LOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.level = level;
        }
        if let Some(json) = lookup(ENV_LOG_JSON) {
            config.json = parse_bool(ENV_LOG_JSON, &json)?;
        }
        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
