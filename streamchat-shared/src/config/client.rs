//! # Client Configuration
//!
//! Endpoints, persistence key and history-polling cadence for the chat client.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_BASE_URL: &str = "/api";
const DEFAULT_CONVERSATION_KEY: &str = "conversation_id";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_RECENCY_WINDOW_MS: u64 = 30_000;
const DEFAULT_QUIESCENCE_POLLS: u32 = 3;

/// Errors raised while loading or validating a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {message}")]
    Parse { message: String },

    #[error("invalid configuration: {field} - {message}")]
    Invalid { field: &'static str, message: String },
}

/// Client configuration. Every field has a default, so partial files are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the chat backend (for example `http://localhost:8000`).
    pub api_base_url: String,

    /// Key under which the active conversation identity is persisted.
    pub conversation_key: String,

    /// Delay between history polls.
    pub poll_interval_ms: u64,

    /// How recent the last persisted message must be to start polling, and
    /// how long polling may last.
    pub recency_window_ms: u64,

    /// Consecutive unchanged polls after which polling stops.
    pub quiescence_polls: u32,

    /// Prompts offered before the backend has produced any suggestions.
    pub default_suggestions: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: option_env!("STREAMCHAT_API_URL")
                .unwrap_or(DEFAULT_API_BASE_URL)
                .to_string(),
            conversation_key: DEFAULT_CONVERSATION_KEY.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            recency_window_ms: DEFAULT_RECENCY_WINDOW_MS,
            quiescence_polls: DEFAULT_QUIESCENCE_POLLS,
            default_suggestions: vec![
                "Tell me about the latest MacBook Air".to_string(),
                "Compare the latest against older models".to_string(),
                "What are the current prices?".to_string(),
            ],
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn recency_window(&self) -> Duration {
        Duration::from_millis(self.recency_window_ms)
    }

    /// Upper bound on poll iterations: one window's worth of intervals.
    #[must_use]
    pub fn max_polls(&self) -> u32 {
        let polls = self.recency_window_ms / self.poll_interval_ms.max(1);
        u32::try_from(polls).unwrap_or(u32::MAX).max(1)
    }

    /// Checks the values that would make polling or requests meaningless.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                message: "must not be empty".to_string(),
            });
        }
        if self.conversation_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "conversation_key",
                message: "must not be empty".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.quiescence_polls == 0 {
            return Err(ConfigError::Invalid {
                field: "quiescence_polls",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Parses a TOML document and validates the result.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse {
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `path`, or the defaults when `path` is `None`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read, parsed or validated.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.recency_window(), Duration::from_secs(30));
        assert_eq!(config.quiescence_polls, 3);
        assert_eq!(config.max_polls(), 15);
        assert_eq!(config.default_suggestions.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            api_base_url = "http://localhost:8000"
            poll_interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.max_polls(), 60);
        assert_eq!(config.conversation_key, "conversation_id");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ClientConfig::from_toml_str("poll_interval_ms = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "poll_interval_ms",
                ..
            }
        ));

        let err = ClientConfig::from_toml_str("quiescence_polls = 0").unwrap_err();
        assert!(err.to_string().contains("quiescence_polls"));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ClientConfig::from_toml_str("poll_interval_ms = \"soon\"").unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base_url = \"http://example.test\"").unwrap();

        let config = ClientConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.api_base_url, "http://example.test");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClientConfig::load(Some(std::path::Path::new("/nonexistent/streamchat.toml")))
            .unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(ClientConfig::load(None).unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_tiny_window_still_polls_once() {
        let config = ClientConfig {
            recency_window_ms: 100,
            ..ClientConfig::default()
        };

        assert_eq!(config.max_polls(), 1);
    }
}
