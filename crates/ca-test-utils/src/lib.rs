//! Testing utilities for the creative agent workspace
//!
//! Scripted inference binding, fixtures, and payload helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use ca_core::{
    AdmissionQueue, AgentConfig, CreativeAgent, CreativeAgentInput, InferenceBinding,
    InferenceError, ModelPayload, RetryConfig,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One recorded binding call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub payload: ModelPayload,
}

/// Binding that replays a script of results in call order
///
/// Every call is recorded. Once the script runs out, calls fail with a
/// non-retryable provider error so a runaway pipeline shows up in assertions.
#[derive(Debug, Default)]
pub struct ScriptedBinding {
    script: Mutex<VecDeque<Result<Value, InferenceError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a `{"response": text}` result
    #[must_use]
    pub fn respond_text(self, text: impl Into<String>) -> Self {
        self.respond(json!({ "response": text.into() }))
    }

    /// Queue an `{"image": base64}` result
    #[must_use]
    pub fn respond_image(self, base64: impl Into<String>) -> Self {
        self.respond(json!({ "image": base64.into() }))
    }

    /// Queue an arbitrary raw result
    #[must_use]
    pub fn respond(self, value: Value) -> Self {
        self.script.lock().push_back(Ok(value));
        self
    }

    /// Queue an overload failure (code 1031)
    #[must_use]
    pub fn fail_overload(self) -> Self {
        self.fail_with(InferenceError::from_message(
            "AiError: Capacity temporarily exceeded, error code: 1031",
        ))
    }

    /// Queue any failure
    #[must_use]
    pub fn fail_with(self, err: InferenceError) -> Self {
        self.script.lock().push_back(Err(err));
        self
    }

    /// Calls received so far
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of calls that were running at once
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Scripted results not consumed yet
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl InferenceBinding for ScriptedBinding {
    async fn run(&self, model: &str, payload: &ModelPayload) -> Result<Value, InferenceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        self.calls.lock().push(RecordedCall {
            model: model.to_string(),
            payload: payload.clone(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.script.lock().pop_front();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| {
            Err(InferenceError::Provider {
                code: None,
                message: "scripted binding exhausted".to_string(),
            })
        })
    }
}

/// Instruction used by the canned end-to-end scenario
pub const LIGHTHOUSE: &str = "A lighthouse keeper befriends a sea monster";

/// Canned outputs for the four text stages, in order
pub const CANNED_PLAN: &str = "1. A storm-lashed lighthouse. 2. A wounded leviathan. 3. A dawn truce.";
pub const CANNED_STORY: &str = "Mara kept the lamp burning while the sea itself knocked at her door.";
pub const CANNED_SYNOPSIS: &str = "A keeper finds a friend in the deep. Fog and lamplight frame them.";
pub const CANNED_IMAGE_PROMPT: &str = "Primary description: a keeper and a glowing sea monster at dawn.";
pub const CANNED_IMAGE: &str = "aW1hZ2UtYnl0ZXM=";

/// Binding scripted with the four canned text responses
#[must_use]
pub fn canned_text_binding() -> ScriptedBinding {
    ScriptedBinding::new()
        .respond_text(CANNED_PLAN)
        .respond_text(CANNED_STORY)
        .respond_text(CANNED_SYNOPSIS)
        .respond_text(CANNED_IMAGE_PROMPT)
}

/// Lighthouse input without image generation
#[must_use]
pub fn lighthouse_input() -> CreativeAgentInput {
    CreativeAgentInput::new(LIGHTHOUSE)
}

/// Config with the default retry policy and no per-call timeout
#[must_use]
pub fn test_config() -> AgentConfig {
    AgentConfig::new()
        .with_call_timeout(None)
        .with_retry(RetryConfig::default())
}

/// Agent over `binding` with its own queue
#[must_use]
pub fn agent_with(binding: Arc<ScriptedBinding>, config: AgentConfig) -> CreativeAgent {
    CreativeAgent::new(binding, AdmissionQueue::shared(), config)
}
