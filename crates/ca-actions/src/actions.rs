//! Action surface
//!
//! Thin request/response wrappers around the core:
//! - `create_random_prompt`: pick a scene prompt
//! - `generate_image` / `generate_story`: single model call, cached by prompt
//! - `run_creative_agent`: the full pipeline

use crate::config::AppConfig;
use ca_cache::{ArtifactKind, ResultCache};
use ca_core::{
    AdmissionQueue, AgentConfig, AgentError, ChatModel, CreativeAgent, CreativeAgentInput,
    CreativeAgentOutput, InferenceBinding, InferenceError, RetryPolicy,
};
use ca_workers::WorkersAiBinding;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Scene prompts offered by `create_random_prompt`
pub const RANDOM_PROMPTS: [&str; 5] = [
    "A magical forest with glowing mushrooms and fairies dancing in the air",
    "A futuristic cityscape with flying cars and advanced technology",
    "An underwater city with mermaids and sea creatures",
    "A space station with advanced technology and spacewalkers",
    "A medieval castle with knights and dragons",
];

const MISSING_BINDING: &str =
    "inference binding not configured: set CLOUDFLARE_ACCOUNT_ID and CLOUDFLARE_API_TOKEN";

/// Uniformly random scene prompt
#[must_use]
pub fn create_random_prompt() -> &'static str {
    RANDOM_PROMPTS[rand::rng().random_range(0..RANDOM_PROMPTS.len())]
}

/// `generateImage` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
}

/// `generateImage` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub image_base64: String,
}

/// `generateStory` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateStoryRequest {
    pub prompt: String,
}

/// `generateStory` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateStoryResponse {
    pub story: String,
}

/// Action handlers sharing one binding, queue, and cache
#[derive(Clone)]
pub struct Actions {
    binding: Option<Arc<dyn InferenceBinding>>,
    queue: Arc<AdmissionQueue>,
    cache: Option<ResultCache>,
    config: AgentConfig,
}

impl Actions {
    /// Create without a binding or cache
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self {
            binding: None,
            queue: Arc::new(AdmissionQueue::new(config.queue)),
            cache: None,
            config,
        }
    }

    /// Build from application configuration
    ///
    /// A binding that cannot be configured is left out; the model-backed
    /// actions then fail with a configuration error.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let mut actions = Self::new(config.agent.clone());

        match WorkersAiBinding::new(config.workers.clone()) {
            Ok(binding) => actions = actions.with_binding(Arc::new(binding)),
            Err(err) => tracing::warn!(error = %err, "Workers AI binding unavailable"),
        }
        if let Some(cache) = ResultCache::from_config(&config.cache) {
            actions = actions.with_cache(cache);
        }
        actions
    }

    /// With inference binding
    #[must_use]
    pub fn with_binding(mut self, binding: Arc<dyn InferenceBinding>) -> Self {
        self.binding = Some(binding);
        self
    }

    /// With result cache
    #[must_use]
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// With shared admission queue
    #[must_use]
    pub fn with_queue(mut self, queue: Arc<AdmissionQueue>) -> Self {
        self.queue = queue;
        self
    }

    /// Admission queue shared by every action
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &Arc<AdmissionQueue> {
        &self.queue
    }

    /// Random scene prompt
    #[must_use]
    pub fn create_random_prompt(&self) -> String {
        create_random_prompt().to_string()
    }

    /// Render an image for a prompt
    ///
    /// # Errors
    /// - `AgentError::Validation` for a blank prompt
    /// - `AgentError::Configuration` without a binding
    /// - `AgentError::Inference` when the model call fails
    pub async fn generate_image(
        &self,
        request: GenerateImageRequest,
    ) -> Result<GenerateImageResponse, AgentError> {
        require_prompt(&request.prompt)?;
        let model = self.chat_model()?;
        let retry = RetryPolicy::from(self.config.retry);
        let prompt = request.prompt.as_str();

        let image_base64 = self
            .cached(ArtifactKind::Image, prompt, || async {
                retry
                    .run("generate_image", || model.generate_image(prompt))
                    .await
            })
            .await?;

        Ok(GenerateImageResponse { image_base64 })
    }

    /// Generate a story for a prompt
    ///
    /// # Errors
    /// Same as [`Actions::generate_image`]
    pub async fn generate_story(
        &self,
        request: GenerateStoryRequest,
    ) -> Result<GenerateStoryResponse, AgentError> {
        require_prompt(&request.prompt)?;
        let model = self.chat_model()?;
        let retry = RetryPolicy::from(self.config.retry);
        let prompt = request.prompt.as_str();

        let story = self
            .cached(ArtifactKind::Story, prompt, || async {
                retry
                    .run("generate_story", || model.complete_prompt(prompt))
                    .await
            })
            .await?;

        Ok(GenerateStoryResponse { story })
    }

    /// Run the full creative pipeline
    ///
    /// # Errors
    /// `AgentError::Configuration` without a binding, otherwise see
    /// [`CreativeAgent::run`]
    pub async fn run_creative_agent(
        &self,
        input: CreativeAgentInput,
    ) -> Result<CreativeAgentOutput, AgentError> {
        let binding = self.binding()?;
        CreativeAgent::new(binding, Arc::clone(&self.queue), self.config.clone())
            .run(&input)
            .await
    }

    async fn cached<F, Fut>(
        &self,
        kind: ArtifactKind,
        prompt: &str,
        generate: F,
    ) -> Result<String, AgentError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String, InferenceError>>,
    {
        let result = match &self.cache {
            Some(cache) => cache.get_or_generate(kind, prompt, generate).await,
            None => generate().await,
        };
        result.map_err(|err| {
            tracing::error!(%kind, code = err.code(), error = %err, "generation failed");
            AgentError::Inference(err)
        })
    }

    fn binding(&self) -> Result<Arc<dyn InferenceBinding>, AgentError> {
        self.binding
            .clone()
            .ok_or_else(|| AgentError::Configuration(MISSING_BINDING.to_string()))
    }

    fn chat_model(&self) -> Result<ChatModel, AgentError> {
        Ok(ChatModel::from_config(
            self.binding()?,
            Arc::clone(&self.queue),
            &self.config,
        ))
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("has_binding", &self.binding.is_some())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn require_prompt(prompt: &str) -> Result<(), AgentError> {
    if prompt.trim().is_empty() {
        return Err(AgentError::Validation("prompt is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_prompts_are_distinct() {
        let unique: HashSet<_> = RANDOM_PROMPTS.iter().collect();
        assert_eq!(unique.len(), RANDOM_PROMPTS.len());
    }

    #[test]
    fn random_prompt_comes_from_list() {
        for _ in 0..50 {
            assert!(RANDOM_PROMPTS.contains(&create_random_prompt()));
        }
    }

    #[test]
    fn response_field_names() {
        let value = serde_json::to_value(GenerateImageResponse {
            image_base64: "aGk=".to_string(),
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "imageBase64": "aGk=" }));
    }

    #[tokio::test]
    async fn model_actions_need_a_binding() {
        let actions = Actions::new(AgentConfig::default());
        let err = actions
            .generate_story(GenerateStoryRequest {
                prompt: "a castle".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "configuration");

        let err = actions
            .run_creative_agent(CreativeAgentInput::new("a castle"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[tokio::test]
    async fn blank_prompt_is_validation_error() {
        let actions = Actions::new(AgentConfig::default());
        let err = actions
            .generate_image(GenerateImageRequest {
                prompt: "  ".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
