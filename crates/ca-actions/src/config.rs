//! Application configuration
//!
//! One TOML file for everything the actions need:
//!
//! ```toml
//! [agent]
//! image_failure = "degrade"
//!
//! [agent.retry]
//! max_attempts = 4
//!
//! [cache]
//! ttl_secs = 3600
//!
//! [workers]
//! account_id = "0123abcd"
//! ```
//!
//! The API token is accepted in the file but never serialized back out;
//! prefer `CLOUDFLARE_API_TOKEN`.

use ca_cache::CacheConfig;
use ca_core::{AgentConfig, ConfigError};
use ca_workers::WorkersConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pipeline settings
    pub agent: AgentConfig,
    /// Result cache settings
    pub cache: CacheConfig,
    /// Hosted binding settings
    pub workers: WorkersConfig,
}

impl AppConfig {
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

    /// Fill missing workers credentials from the environment
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.workers = self.workers.with_vars(|name| std::env::var(name).ok());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_core::ImageFailurePolicy;
    use std::io::Write;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn nested_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [agent]
            image_failure = "degrade"

            [agent.retry]
            max_attempts = 4

            [cache]
            enabled = false

            [workers]
            account_id = "acct"
            api_token = "tok"
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.image_failure, ImageFailurePolicy::Degrade);
        assert_eq!(config.agent.retry.max_attempts, 4);
        assert_eq!(config.agent.retry.initial_delay_ms, 1000);
        assert!(!config.cache.enabled);
        assert_eq!(config.workers.account_id, "acct");
        assert!(config.workers.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nttl_secs = 5").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.ttl_secs, 5);
    }

    #[test]
    fn unknown_policy_rejected() {
        assert!(AppConfig::from_toml_str("[agent]\nimage_failure = \"retry\"").is_err());
    }
}
