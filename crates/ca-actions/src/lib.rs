//! Creative Agent Actions
//!
//! Request/response surface over the creative agent core, plus the
//! application configuration that wires a binding, queue, and cache together.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod actions;
pub mod config;

pub use actions::{
    create_random_prompt, Actions, GenerateImageRequest, GenerateImageResponse,
    GenerateStoryRequest, GenerateStoryResponse, RANDOM_PROMPTS,
};
pub use config::AppConfig;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
