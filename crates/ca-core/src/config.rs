//! Agent configuration
//!
//! All sections deserialize from TOML with defaults for anything omitted:
//!
//! ```toml
//! call_timeout_ms = 60000
//! image_failure = "degrade"
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 1000
//! max_delay_ms = 5000
//!
//! [queue]
//! max_depth = 32
//!
//! [models]
//! text = "@cf/meta/llama-3.1-8b-instruct"
//! image = "@cf/black-forest-labs/flux-1-schnell"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default chat-completion model
pub const DEFAULT_TEXT_MODEL: &str = "@cf/meta/llama-3.1-8b-instruct";
/// Default image model
pub const DEFAULT_IMAGE_MODEL: &str = "@cf/black-forest-labs/flux-1-schnell";

/// Creative agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Retry policy for every model call
    pub retry: RetryConfig,
    /// Admission queue settings
    pub queue: QueueConfig,
    /// Model identifiers
    pub models: ModelConfig,
    /// What an image failure does to the run
    pub image_failure: ImageFailurePolicy,
    /// Per-call timeout in milliseconds (`None` or `0` disables it)
    pub call_timeout_ms: Option<u64>,
}

impl AgentConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With retry configuration
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// With queue configuration
    #[inline]
    #[must_use]
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// With image failure policy
    #[inline]
    #[must_use]
    pub fn with_image_failure(mut self, policy: ImageFailurePolicy) -> Self {
        self.image_failure = policy;
        self
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With model identifiers
    #[inline]
    #[must_use]
    pub fn with_models(mut self, models: ModelConfig) -> Self {
        self.models = models;
        self
    }

    /// Per-call timeout as a duration
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this structure
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::from)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            queue: QueueConfig::default(),
            models: ModelConfig::default(),
            image_failure: ImageFailurePolicy::default(),
            call_timeout_ms: Some(60_000),
        }
    }
}

/// Retry configuration for transient provider overload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_delay_ms: u64,
    /// Ceiling for any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

/// Admission queue configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum waiting plus running tasks (`None` = unbounded)
    pub max_depth: Option<usize>,
}

impl QueueConfig {
    /// Unbounded queue
    #[inline]
    #[must_use]
    pub fn unbounded() -> Self {
        Self { max_depth: None }
    }

    /// Queue that rejects work beyond `max_depth`
    #[inline]
    #[must_use]
    pub fn bounded(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }
}

/// Model identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Chat-completion model
    pub text: String,
    /// Text-to-image model
    pub image: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

/// Effect of an image-generation failure on the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFailurePolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Return the text output with the image error recorded
    Degrade,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config text is malformed
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_policy() {
        let config = AgentConfig::new();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.retry.max_delay_ms, 5000);
        assert_eq!(config.queue.max_depth, None);
        assert_eq!(config.image_failure, ImageFailurePolicy::Abort);
        assert_eq!(config.models.text, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(AgentConfig::from_toml_str("").unwrap(), AgentConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let config = AgentConfig::from_toml_str(
            r#"
            image_failure = "degrade"

            [retry]
            max_attempts = 5

            [queue]
            max_depth = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.image_failure, ImageFailurePolicy::Degrade);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.queue.max_depth, Some(8));
        assert_eq!(config.models, ModelConfig::default());
    }

    #[test]
    fn invalid_toml_rejected() {
        let err = AgentConfig::from_toml_str("image_failure = \"explode\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "call_timeout_ms = 250").unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.call_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn load_missing_file() {
        let err = AgentConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn zero_timeout_disables() {
        let config = AgentConfig::from_toml_str("call_timeout_ms = 0").unwrap();
        assert_eq!(config.call_timeout(), None);
    }

    #[test]
    fn builder_timeout() {
        let config = AgentConfig::new().with_call_timeout(None);
        assert_eq!(config.call_timeout(), None);
    }
}
