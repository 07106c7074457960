//! Creative agent orchestrator
//!
//! Runs the pipeline for one request:
//! 1. Validate the instruction and resolve defaults
//! 2. Plan, write, summarize, and build the image prompt, in order
//! 3. Optionally render the image
//! 4. Assemble the output
//!
//! Every model call is retried on overload and funneled through the shared
//! admission queue. A text-stage failure aborts the run with no partial output.

use crate::config::{AgentConfig, ImageFailurePolicy};
use crate::error::{AgentError, InferenceError};
use crate::inference::{ChatModel, InferenceBinding};
use crate::queue::AdmissionQueue;
use crate::retry::RetryPolicy;
use crate::templates::{self, PromptTemplate, TemplateVars};
use crate::types::{CreativeAgentInput, CreativeAgentOutput, ResolvedSettings, Stage};
use std::sync::Arc;
use std::time::Instant;

/// Creative agent
#[derive(Debug, Clone)]
pub struct CreativeAgent {
    model: ChatModel,
    retry: RetryPolicy,
    image_failure: ImageFailurePolicy,
}

impl CreativeAgent {
    /// Create agent over a binding and the shared queue
    #[must_use]
    pub fn new(
        binding: Arc<dyn InferenceBinding>,
        queue: Arc<AdmissionQueue>,
        config: AgentConfig,
    ) -> Self {
        Self {
            model: ChatModel::from_config(binding, queue, &config),
            retry: RetryPolicy::from(config.retry),
            image_failure: config.image_failure,
        }
    }

    /// Run the full pipeline
    ///
    /// # Errors
    /// - `AgentError::Validation` if the instruction is blank
    /// - `AgentError::Stage` naming the first stage that failed
    pub async fn run(&self, input: &CreativeAgentInput) -> Result<CreativeAgentOutput, AgentError> {
        let started = Instant::now();
        let result = self.run_stages(input).await;

        match &result {
            Ok(output) => tracing::info!(
                elapsed_ms = elapsed_ms(started),
                has_image = output.image_base64.is_some(),
                "creative agent completed"
            ),
            Err(err) if err.is_overloaded() => tracing::error!(
                stage = err.failed_stage().map(|s| s.label()),
                error = %err,
                "creative agent failed: inference provider overloaded, try again shortly"
            ),
            Err(err) => tracing::error!(
                stage = err.failed_stage().map(|s| s.label()),
                code = err.code(),
                error = %err,
                "creative agent failed"
            ),
        }
        result
    }

    async fn run_stages(&self, input: &CreativeAgentInput) -> Result<CreativeAgentOutput, AgentError> {
        let instruction = input
            .instruction_text()
            .ok_or_else(|| AgentError::Validation("instruction is required".to_string()))?;
        let settings = ResolvedSettings::resolve(input);

        tracing::info!(
            instruction_len = instruction.len(),
            generate_image = input.generate_image,
            "creative agent started"
        );

        let mut story_plan = String::new();
        let mut story = String::new();
        let mut synopsis = String::new();
        let mut image_prompt = String::new();
        let (mut image_base64, mut image_error) = (None, None);

        let mut stage = Stage::Planning;
        loop {
            match stage {
                Stage::Planning => {
                    story_plan = self
                        .text_stage(
                            stage,
                            &templates::PLAN,
                            &TemplateVars::new()
                                .with("instruction", instruction)
                                .with("tone", settings.tone.as_str()),
                        )
                        .await?;
                }
                Stage::Writing => {
                    story = self
                        .text_stage(
                            stage,
                            &templates::STORY,
                            &TemplateVars::new()
                                .with("plan", story_plan.as_str())
                                .with("style", settings.style.as_str())
                                .with("instruction", instruction),
                        )
                        .await?;
                }
                Stage::Summarizing => {
                    synopsis = self
                        .text_stage(
                            stage,
                            &templates::SYNOPSIS,
                            &TemplateVars::new().with("story", story.as_str()),
                        )
                        .await?;
                }
                Stage::Imagining => {
                    let image = &settings.image;
                    image_prompt = self
                        .text_stage(
                            stage,
                            &templates::IMAGE_PROMPT,
                            &TemplateVars::new()
                                .with("story", story.as_str())
                                .with("tone", settings.tone.as_str())
                                .with("style", settings.style.as_str())
                                .with("imageArtStyle", image.art_style.as_str())
                                .with("imageLighting", image.lighting.as_str())
                                .with("imageColorPalette", image.color_palette.as_str())
                                .with("imageLens", image.lens.as_str())
                                .with("imageRendering", image.rendering.as_str())
                                .with("detailLevel", image.detail_level.as_str()),
                        )
                        .await?;
                }
                Stage::Rendering => {
                    (image_base64, image_error) = self.image_stage(&image_prompt).await?;
                }
                Stage::Done => break,
            }
            stage = stage.next(input.generate_image);
        }

        let ResolvedSettings { tone, style, image } = settings;
        Ok(CreativeAgentOutput {
            story_plan,
            story,
            synopsis,
            image_prompt,
            image_base64,
            image_settings: image,
            tone,
            style,
            image_error,
        })
    }

    async fn text_stage(
        &self,
        stage: Stage,
        template: &PromptTemplate,
        vars: &TemplateVars,
    ) -> Result<String, AgentError> {
        let messages = template.render(vars)?;
        let started = Instant::now();
        tracing::debug!(stage = stage.label(), template = template.name, "stage started");

        let text = self
            .retry
            .run(stage.label(), || self.model.complete(messages.clone()))
            .await
            .map_err(|source| AgentError::stage(stage, source))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::stage(
                stage,
                InferenceError::invalid_response("non-empty text", "model returned blank output"),
            ));
        }

        tracing::info!(
            stage = stage.label(),
            elapsed_ms = elapsed_ms(started),
            chars = text.len(),
            "stage completed"
        );
        Ok(text.to_string())
    }

    async fn image_stage(
        &self,
        image_prompt: &str,
    ) -> Result<(Option<String>, Option<String>), AgentError> {
        let stage = Stage::Rendering;
        let started = Instant::now();
        tracing::debug!(stage = stage.label(), "stage started");

        match self
            .retry
            .run(stage.label(), || self.model.generate_image(image_prompt))
            .await
        {
            Ok(image) => {
                tracing::info!(
                    stage = stage.label(),
                    elapsed_ms = elapsed_ms(started),
                    bytes = image.len(),
                    "stage completed"
                );
                Ok((Some(image), None))
            }
            Err(source) => match self.image_failure {
                ImageFailurePolicy::Abort => Err(AgentError::stage(stage, source)),
                ImageFailurePolicy::Degrade => {
                    tracing::warn!(
                        stage = stage.label(),
                        error = %source,
                        "image generation failed, returning text-only result"
                    );
                    Ok((None, Some(source.to_string())))
                }
            },
        }
    }
}

/// Run the pipeline once with a throwaway agent
///
/// # Errors
/// See [`CreativeAgent::run`]
pub async fn run_creative_agent(
    input: &CreativeAgentInput,
    binding: Arc<dyn InferenceBinding>,
    queue: Arc<AdmissionQueue>,
    config: AgentConfig,
) -> Result<CreativeAgentOutput, AgentError> {
    CreativeAgent::new(binding, queue, config).run(input).await
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
