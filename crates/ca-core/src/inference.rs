//! Inference adapter
//!
//! Bridges the pipeline to a hosted inference binding:
//! - [`InferenceBinding`]: the external `run(model, payload)` collaborator
//! - [`ModelPayload`]: the two request shapes (chat messages, bare prompt)
//! - [`ChatModel`]: queued, time-limited calls with typed response parsing

use crate::config::{AgentConfig, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::error::InferenceError;
use crate::queue::AdmissionQueue;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// System turn
    #[inline]
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User turn
    #[inline]
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request body handed to the binding
///
/// Serializes as `{"messages": [...]}` or `{"prompt": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelPayload {
    Chat { messages: Vec<ChatMessage> },
    Prompt { prompt: String },
}

impl ModelPayload {
    /// Chat payload
    #[inline]
    #[must_use]
    pub fn chat(messages: Vec<ChatMessage>) -> Self {
        Self::Chat { messages }
    }

    /// Prompt-only payload
    #[inline]
    #[must_use]
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::Prompt {
            prompt: prompt.into(),
        }
    }

    /// Check whether any text in the payload contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            Self::Chat { messages } => messages.iter().any(|m| m.content.contains(needle)),
            Self::Prompt { prompt } => prompt.contains(needle),
        }
    }
}

/// Hosted inference binding
///
/// Implementations report failures as [`InferenceError`]; use
/// [`InferenceError::from_provider`] or [`InferenceError::from_message`] so
/// overload is classified once, at the edge.
#[async_trait]
pub trait InferenceBinding: Send + Sync {
    /// Run `model` on `payload` and return the raw result object
    async fn run(
        &self,
        model: &str,
        payload: &ModelPayload,
    ) -> Result<serde_json::Value, InferenceError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    image: String,
}

/// Chat model on top of a binding and the shared admission queue
#[derive(Clone)]
pub struct ChatModel {
    binding: Arc<dyn InferenceBinding>,
    queue: Arc<AdmissionQueue>,
    text_model: String,
    image_model: String,
    timeout: Option<Duration>,
}

impl ChatModel {
    /// Create with default models and no timeout
    #[must_use]
    pub fn new(binding: Arc<dyn InferenceBinding>, queue: Arc<AdmissionQueue>) -> Self {
        Self {
            binding,
            queue,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout: None,
        }
    }

    /// Create with models and timeout from agent configuration
    #[must_use]
    pub fn from_config(
        binding: Arc<dyn InferenceBinding>,
        queue: Arc<AdmissionQueue>,
        config: &AgentConfig,
    ) -> Self {
        Self::new(binding, queue)
            .with_text_model(config.models.text.clone())
            .with_image_model(config.models.image.clone())
            .with_timeout(config.call_timeout())
    }

    /// With chat-completion model
    #[inline]
    #[must_use]
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// With image model
    #[inline]
    #[must_use]
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Chat-completion model id
    #[inline]
    #[must_use]
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// Image model id
    #[inline]
    #[must_use]
    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Send chat messages to the text model and return the response text
    ///
    /// # Errors
    /// Binding failure, timeout, queue failure, or a result without a
    /// string `response` field
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, InferenceError> {
        tracing::debug!(
            model = %self.text_model,
            messages = messages.len(),
            "calling chat model"
        );
        let value = self
            .call(&self.text_model, ModelPayload::chat(messages))
            .await?;
        parse::<ChatResponse>(value, "object with string `response`").map(|r| r.response)
    }

    /// Send a bare prompt to the text model and return the response text
    ///
    /// # Errors
    /// Same as [`ChatModel::complete`]
    pub async fn complete_prompt(&self, prompt: &str) -> Result<String, InferenceError> {
        tracing::debug!(model = %self.text_model, prompt_len = prompt.len(), "calling text model");
        let value = self
            .call(&self.text_model, ModelPayload::prompt(prompt))
            .await?;
        parse::<ChatResponse>(value, "object with string `response`").map(|r| r.response)
    }

    /// Render `prompt` with the image model and return the base64 image
    ///
    /// # Errors
    /// Binding failure, timeout, queue failure, or a result without a
    /// string `image` field
    pub async fn generate_image(&self, prompt: &str) -> Result<String, InferenceError> {
        tracing::debug!(model = %self.image_model, prompt_len = prompt.len(), "calling image model");
        let value = self
            .call(&self.image_model, ModelPayload::prompt(prompt))
            .await?;
        parse::<ImageResponse>(value, "object with string `image`").map(|r| r.image)
    }

    async fn call(
        &self,
        model: &str,
        payload: ModelPayload,
    ) -> Result<serde_json::Value, InferenceError> {
        let binding = Arc::clone(&self.binding);
        let timeout = self.timeout;
        let task_model = model.to_string();

        let result = self
            .queue
            .enqueue(move || async move {
                let call = binding.run(&task_model, &payload);
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                        Err(InferenceError::Timeout {
                            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        })
                    }),
                    None => call.await,
                }
            })
            .await?;

        if let Err(err) = &result {
            match err.provider_code() {
                Some(code) => tracing::warn!(model, code, error = %err, "model call failed"),
                None => tracing::warn!(model, error = %err, "model call failed"),
            }
        }
        result
    }
}

impl fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatModel")
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn parse<T: DeserializeOwned>(
    value: serde_json::Value,
    expected: &'static str,
) -> Result<T, InferenceError> {
    serde_json::from_value(value).map_err(|err| {
        tracing::warn!(expected, error = %err, "invalid response format");
        InferenceError::invalid_response(expected, err.to_string())
    })
}
