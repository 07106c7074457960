//! Workers AI binding for the creative agent
//!
//! Runs models through the hosted REST endpoint
//! `POST {base_url}/accounts/{account_id}/ai/run/{model}` and unwraps the
//! `{success, result, errors}` envelope into the shape the adapter expects.

#![warn(unreachable_pub)]

pub mod binding;
pub mod config;

pub use binding::{parse_envelope, WorkersAiBinding};
pub use config::{WorkersConfig, WorkersError, ACCOUNT_ID_ENV, API_TOKEN_ENV, DEFAULT_BASE_URL};
