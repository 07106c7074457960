//! Workers AI account configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Environment variable holding the account id
pub const ACCOUNT_ID_ENV: &str = "CLOUDFLARE_ACCOUNT_ID";
/// Environment variable holding the API token
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";
/// Public REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Binding configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkersError {
    /// Account id or token not supplied
    #[error("Workers AI binding not configured: set {0}")]
    MissingCredential(&'static str),

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Workers AI REST settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Account that owns the AI binding
    pub account_id: String,
    /// API token with Workers AI read permission
    #[serde(skip_serializing)]
    pub api_token: String,
    /// REST API root
    pub base_url: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl WorkersConfig {
    /// Create for an account
    #[must_use]
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            ..Self::default()
        }
    }

    /// Credentials from `CLOUDFLARE_ACCOUNT_ID` / `CLOUDFLARE_API_TOKEN`
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_vars(|name| std::env::var(name).ok())
    }

    /// Fill blank credentials from a variable lookup
    #[must_use]
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.account_id.is_empty() {
            self.account_id = lookup(ACCOUNT_ID_ENV).unwrap_or_default();
        }
        if self.api_token.is_empty() {
            self.api_token = lookup(API_TOKEN_ENV).unwrap_or_default();
        }
        self
    }

    /// With REST API root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Check both credentials are present
    ///
    /// # Errors
    /// Names the first missing credential
    pub fn validate(&self) -> Result<(), WorkersError> {
        if self.account_id.trim().is_empty() {
            return Err(WorkersError::MissingCredential(ACCOUNT_ID_ENV));
        }
        if self.api_token.trim().is_empty() {
            return Err(WorkersError::MissingCredential(API_TOKEN_ENV));
        }
        Ok(())
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Endpoint for running `model`
    #[must_use]
    pub fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url.trim_end_matches('/'),
            self.account_id,
            model.trim_start_matches('/')
        )
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            api_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl fmt::Debug for WorkersConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkersConfig")
            .field("account_id", &self.account_id)
            .field("api_token", &if self.api_token.is_empty() { "" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_url_layout() {
        let config = WorkersConfig::new("acct", "tok");
        assert_eq!(
            config.run_url("@cf/meta/llama-3.1-8b-instruct"),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run/@cf/meta/llama-3.1-8b-instruct"
        );

        let local = config.with_base_url("http://127.0.0.1:8787/");
        assert_eq!(local.run_url("m"), "http://127.0.0.1:8787/accounts/acct/ai/run/m");
    }

    #[test]
    fn credentials_from_lookup() {
        let config = WorkersConfig::default().with_vars(|name| match name {
            ACCOUNT_ID_ENV => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.account_id, "from-env");
        assert_eq!(
            config.validate(),
            Err(WorkersError::MissingCredential(API_TOKEN_ENV))
        );
    }

    #[test]
    fn explicit_values_win_over_lookup() {
        let config = WorkersConfig::new("file", "file-token").with_vars(|_| Some("env".to_string()));
        assert_eq!(config.account_id, "file");
        assert_eq!(config.api_token, "file-token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let text = format!("{:?}", WorkersConfig::new("acct", "s3cret"));
        assert!(!text.contains("s3cret"));
        assert!(text.contains("<redacted>"));
    }

    #[test]
    fn toml_defaults() {
        let config: WorkersConfig = toml::from_str("account_id = \"abc\"").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.validate(), Err(WorkersError::MissingCredential(API_TOKEN_ENV)));
    }
}
