//! Creative Agent Core
//!
//! Multi-stage story and image pipeline over a hosted inference binding:
//! - Plans, writes, summarizes, and builds an image prompt, strictly in order
//! - Serializes every model call through a shared admission queue
//! - Retries provider overload with bounded exponential backoff
//! - Resolves caller style knobs against fixed defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use ca_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(binding: Arc<dyn InferenceBinding>) -> Result<(), AgentError> {
//! let queue = AdmissionQueue::shared();
//! let agent = CreativeAgent::new(binding, queue, AgentConfig::new());
//!
//! let input = CreativeAgentInput::new("A lighthouse keeper befriends a sea monster")
//!     .with_tone("wistful");
//! let output = agent.run(&input).await?;
//!
//! println!("{}", output.synopsis);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod agent;
pub mod config;
pub mod error;
pub mod inference;
pub mod queue;
pub mod retry;
pub mod templates;
pub mod types;

pub use agent::{run_creative_agent, CreativeAgent};
pub use config::{
    AgentConfig, ConfigError, ImageFailurePolicy, ModelConfig, QueueConfig, RetryConfig,
    DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL,
};
pub use error::{AgentError, InferenceError, QueueError, TemplateError, OVERLOAD_ERROR_CODE};
pub use inference::{ChatMessage, ChatModel, InferenceBinding, ModelPayload, Role};
pub use queue::{AdmissionQueue, QueueStats};
pub use retry::RetryPolicy;
pub use templates::{PromptTemplate, TemplateVars};
pub use types::{CreativeAgentInput, CreativeAgentOutput, ImageSettings, ResolvedSettings, Stage};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the creative agent
    pub use crate::{
        AdmissionQueue, AgentConfig, AgentError, ChatModel, CreativeAgent, CreativeAgentInput,
        CreativeAgentOutput, ImageFailurePolicy, InferenceBinding, InferenceError, ModelPayload,
        RetryPolicy, Stage,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
