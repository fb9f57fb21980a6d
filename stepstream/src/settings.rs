//! Settings consumed by provider-backed steps.
//!
//! Settings are validated when a step starts. A missing or malformed section is
//! a setup error returned from `start`; no work is launched.

use crate::errors::StepError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the engine name.
pub const ENGINE_ENV_VAR: &str = "STEPSTREAM_ENGINE";
/// Environment variable holding the sampling temperature.
pub const TEMPERATURE_ENV_VAR: &str = "STEPSTREAM_TEMPERATURE";
/// Environment variable holding the response token limit.
pub const MAX_TOKENS_ENV_VAR: &str = "STEPSTREAM_MAX_TOKENS";
/// Environment variable used when Claude settings carry no API key.
pub const CLAUDE_API_KEY_ENV_VAR: &str = "CLAUDE_API_KEY";

/// Connection settings shared by every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Organization identifier, if the provider needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

fn default_timeout() -> f64 {
    120.0
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            organization: None,
        }
    }
}

impl ClientSettings {
    /// Creates client settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }
}

/// Chat request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Engine name, e.g. `vertex-text-bison` or `claude-2`.
    #[serde(default)]
    pub engine: Option<String>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling mass.
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Maximum tokens in the response.
    #[serde(default)]
    pub max_response_tokens: Option<u32>,
    /// Stop sequences.
    #[serde(default)]
    pub stop: Vec<String>,
    /// Whether the provider should stream partial responses.
    #[serde(default)]
    pub stream: bool,
}

impl ChatSettings {
    /// Temperature, defaulting to 0.0.
    #[must_use]
    pub fn temperature_or_default(&self) -> f64 {
        self.temperature.unwrap_or(0.0)
    }

    /// Response token limit, defaulting to 32.
    #[must_use]
    pub fn max_response_tokens_or_default(&self) -> u32 {
        self.max_response_tokens.unwrap_or(32)
    }

    /// Sets the engine.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }
}

/// Claude-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaudeSettings {
    /// Top-k sampling.
    #[serde(default)]
    pub top_k: Option<u32>,
    /// End-user identifier forwarded to the API.
    #[serde(default)]
    pub user_id: Option<String>,
    /// API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ClaudeSettings {
    /// Returns the configured API key, falling back to `CLAUDE_API_KEY`.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(CLAUDE_API_KEY_ENV_VAR).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Vertex-specific settings. Authentication comes from the ambient GCP
/// environment, not from these settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexSettings {
    /// Number of candidates to request.
    #[serde(default)]
    pub n: Option<u32>,
    /// Endpoint override.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl VertexSettings {
    /// Candidate count, defaulting to 1.
    #[must_use]
    pub fn n_or_default(&self) -> u32 {
        self.n.unwrap_or(1)
    }
}

/// Provider family selected by the engine name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Engines prefixed with `vertex`.
    Vertex,
    /// Engines prefixed with `claude`.
    Claude,
    /// Any other engine.
    Generic,
}

impl ProviderKind {
    /// Classifies an engine name.
    #[must_use]
    pub fn from_engine(engine: &str) -> Self {
        if engine.starts_with("vertex") {
            Self::Vertex
        } else if engine.starts_with("claude") {
            Self::Claude
        } else {
            Self::Generic
        }
    }
}

/// All settings a provider-backed step may need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSettings {
    /// Connection settings; required.
    #[serde(default)]
    pub client: Option<ClientSettings>,
    /// Chat parameters.
    #[serde(default)]
    pub chat: ChatSettings,
    /// Claude section; required for `claude*` engines.
    #[serde(default)]
    pub claude: Option<ClaudeSettings>,
    /// Vertex section; required for `vertex*` engines.
    #[serde(default)]
    pub vertex: Option<VertexSettings>,
}

impl StepSettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, StepError> {
        serde_json::from_str(json).map_err(|e| StepError::InvalidSettings(e.to_string()))
    }

    /// Builds settings from environment variables, with default client settings.
    pub fn from_env() -> Result<Self, StepError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StepError> {
        let mut settings = Self {
            client: Some(ClientSettings::default()),
            ..Self::default()
        };

        settings.chat.engine = lookup(ENGINE_ENV_VAR).filter(|e| !e.is_empty());
        if let Some(raw) = lookup(TEMPERATURE_ENV_VAR) {
            let value = raw.trim().parse::<f64>().map_err(|e| {
                StepError::InvalidSettings(format!("{TEMPERATURE_ENV_VAR}='{raw}': {e}"))
            })?;
            settings.chat.temperature = Some(value);
        }
        if let Some(raw) = lookup(MAX_TOKENS_ENV_VAR) {
            let value = raw.trim().parse::<u32>().map_err(|e| {
                StepError::InvalidSettings(format!("{MAX_TOKENS_ENV_VAR}='{raw}': {e}"))
            })?;
            settings.chat.max_response_tokens = Some(value);
        }

        Ok(settings)
    }

    /// Sets the client section.
    #[must_use]
    pub fn with_client(mut self, client: ClientSettings) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the engine.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.chat.engine = Some(engine.into());
        self
    }

    /// Sets the Claude section.
    #[must_use]
    pub fn with_claude(mut self, claude: ClaudeSettings) -> Self {
        self.claude = Some(claude);
        self
    }

    /// Sets the Vertex section.
    #[must_use]
    pub fn with_vertex(mut self, vertex: VertexSettings) -> Self {
        self.vertex = Some(vertex);
        self
    }

    /// Checks that everything needed to start is present.
    ///
    /// Returns the provider family selected by the engine.
    pub fn validate(&self) -> Result<ProviderKind, StepError> {
        if self.client.is_none() {
            return Err(StepError::MissingSettings("client".to_string()));
        }

        let engine = self
            .chat
            .engine
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| StepError::MissingSettings("chat.engine".to_string()))?;

        if let Some(t) = self.chat.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(StepError::InvalidSettings(format!(
                    "chat.temperature {t} outside 0.0..=2.0"
                )));
            }
        }

        let kind = ProviderKind::from_engine(engine);
        match kind {
            ProviderKind::Vertex if self.vertex.is_none() => {
                Err(StepError::MissingSettings("vertex".to_string()))
            }
            ProviderKind::Claude if self.claude.is_none() => {
                Err(StepError::MissingSettings("claude".to_string()))
            }
            _ => Ok(kind),
        }
    }
}
