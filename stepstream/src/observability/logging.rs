//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `LogConfig::filter`, if set
//! 2. the `STEPSTREAM_LOG` environment variable (e.g. "info", "stepstream=debug")
//! 3. default to `info`
//!
//! Logs go to stderr so that step output written to stdout stays clean.

use crate::errors::StepError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for the log filter.
pub const LOG_ENV_VAR: &str = "STEPSTREAM_LOG";

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Subscriber configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Explicit filter directive; overrides the environment.
    #[serde(default)]
    pub filter: Option<String>,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Whether to include the event target.
    #[serde(default)]
    pub with_target: bool,
}

impl LogConfig {
    /// Creates a text config with no explicit filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Resolves the effective filter directive.
    #[must_use]
    pub fn directive(&self) -> String {
        self.filter
            .clone()
            .or_else(|| std::env::var(LOG_ENV_VAR).ok())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "info".to_string())
    }
}

/// Installs the global subscriber.
///
/// Returns `Ok(false)` if another subscriber was already installed, so calling
/// this more than once is harmless.
pub fn init_tracing(config: &LogConfig) -> Result<bool, StepError> {
    let directive = config.directive();
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| StepError::InvalidSettings(format!("log filter '{directive}': {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };

    if !installed {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(installed)
}
