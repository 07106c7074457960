//! Error types for the creative agent
//!
//! Provides typed failures for:
//! - Inference binding calls (overload, malformed responses, provider faults)
//! - Admission queue rejection and task loss
//! - Prompt template rendering
//! - Whole pipeline runs, tagged with the stage that failed

use crate::types::Stage;
use once_cell::sync::Lazy;
use regex::Regex;

/// Provider code that marks a transient overload
pub const OVERLOAD_ERROR_CODE: u32 = 1031;

static ERROR_CODE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"error code: (\d+)").expect("error code pattern compiles"));

/// Failure of a single inference binding call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    /// Provider is overloaded; the only retryable failure
    #[error("provider overloaded (error code: {}): {message}", OVERLOAD_ERROR_CODE)]
    Overloaded { message: String },

    /// Binding returned a result that does not match the expected shape
    #[error("invalid response shape: expected {expected}: {detail}")]
    InvalidResponse { expected: &'static str, detail: String },

    /// Any other provider-reported failure
    #[error("provider error{}: {message}", .code.map(|c| format!(" (error code: {c})")).unwrap_or_default())]
    Provider { code: Option<u32>, message: String },

    /// Call exceeded the configured per-call timeout
    #[error("inference call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Network or protocol failure talking to the binding
    #[error("transport error: {0}")]
    Transport(String),

    /// The admission queue could not run the call
    #[error("admission queue: {0}")]
    Queue(#[from] QueueError),
}

impl InferenceError {
    /// Classify a structured provider failure
    #[must_use]
    pub fn from_provider(code: Option<u32>, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Some(OVERLOAD_ERROR_CODE) => Self::Overloaded { message },
            _ => Self::Provider { code, message },
        }
    }

    /// Classify a failure that only carries a message
    ///
    /// Looks for an embedded `error code: <n>` token. This is the only place
    /// where a message string is inspected; everything downstream matches on
    /// the variant.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let code = ERROR_CODE_TOKEN
            .captures(&message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        Self::from_provider(code, message)
    }

    /// Build an invalid response error
    #[must_use]
    pub fn invalid_response(expected: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            expected,
            detail: detail.into(),
        }
    }

    /// Check if the failure should be retried
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded { .. })
    }

    /// Provider code, if one is known
    #[must_use]
    pub fn provider_code(&self) -> Option<u32> {
        match self {
            Self::Overloaded { .. } => Some(OVERLOAD_ERROR_CODE),
            Self::Provider { code, .. } => *code,
            _ => None,
        }
    }

    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Overloaded { .. } => "overloaded",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::Provider { .. } => "provider",
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::Queue(QueueError::Full { .. }) => "queue_full",
            Self::Queue(_) => "queue",
        }
    }
}

/// Admission queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Queue depth limit reached
    #[error("queue full (max depth: {capacity})")]
    Full { capacity: usize },

    /// Task panicked or was dropped before producing a result
    #[error("queued task aborted before completing")]
    TaskAborted,

    /// Drain worker is gone
    #[error("queue closed")]
    Closed,
}

/// Prompt template rendering errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Placeholder without a supplied value
    #[error("missing template variable: {0}")]
    MissingVariable(String),

    /// `{` without a matching `}`
    #[error("unclosed placeholder in template '{template}'")]
    Unclosed { template: &'static str },
}

/// Main creative agent error type
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Required external binding or setting is absent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller input is missing or blank
    #[error("validation error: {0}")]
    Validation(String),

    /// Prompt template could not be rendered
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// A pipeline stage failed after retries were exhausted or skipped
    #[error("{} failed: {source}", .stage.label())]
    Stage {
        stage: Stage,
        #[source]
        source: InferenceError,
    },

    /// A standalone inference call failed
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

impl AgentError {
    /// Wrap an inference failure with its stage
    #[inline]
    #[must_use]
    pub fn stage(stage: Stage, source: InferenceError) -> Self {
        Self::Stage { stage, source }
    }

    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
            Self::Template(_) => "template",
            Self::Stage { source, .. } | Self::Inference(source) => source.code(),
        }
    }

    /// Underlying inference failure, if any
    #[must_use]
    pub fn inference(&self) -> Option<&InferenceError> {
        match self {
            Self::Stage { source, .. } | Self::Inference(source) => Some(source),
            _ => None,
        }
    }

    /// Check if the provider was overloaded
    #[inline]
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        self.inference().is_some_and(InferenceError::is_retryable)
    }

    /// Stage that failed, if the error came from the pipeline
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_code_is_overload() {
        let err = InferenceError::from_provider(Some(1031), "busy");
        assert!(err.is_retryable());
        assert_eq!(err.provider_code(), Some(1031));
    }

    #[test]
    fn other_codes_are_not_retryable() {
        let err = InferenceError::from_provider(Some(5007), "no such model");
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "provider");
    }

    #[test]
    fn from_message_extracts_code() {
        let err = InferenceError::from_message("AiError: 3040: Capacity temporarily exceeded, error code: 1031");
        assert!(matches!(err, InferenceError::Overloaded { .. }));

        let err = InferenceError::from_message("error code: 3010");
        assert_eq!(err.provider_code(), Some(3010));
        assert!(!err.is_retryable());
    }

    #[test]
    fn from_message_without_code() {
        let err = InferenceError::from_message("connection reset");
        assert_eq!(
            err,
            InferenceError::Provider {
                code: None,
                message: "connection reset".to_string()
            }
        );
    }

    #[test]
    fn overload_display_preserves_message() {
        let err = InferenceError::from_provider(Some(1031), "model is busy");
        let text = err.to_string();
        assert!(text.contains("model is busy"));
        assert!(text.contains("1031"));
    }

    #[test]
    fn agent_error_codes() {
        assert_eq!(AgentError::Validation("x".into()).code(), "validation");
        assert_eq!(
            AgentError::stage(Stage::Writing, InferenceError::Timeout { after_ms: 10 }).code(),
            "timeout"
        );
        assert_eq!(
            AgentError::Inference(QueueError::Full { capacity: 2 }.into()).code(),
            "queue_full"
        );
    }

    #[test]
    fn stage_error_display_names_stage() {
        let err = AgentError::stage(
            Stage::Summarizing,
            InferenceError::invalid_response("response", "missing field"),
        );
        assert!(err.to_string().starts_with("Synopsis Generation failed"));
        assert_eq!(err.failed_stage(), Some(Stage::Summarizing));
        assert!(!err.is_overloaded());
    }
}
