//! REST implementation of the inference binding

use crate::config::{WorkersConfig, WorkersError};
use async_trait::async_trait;
use ca_core::{InferenceBinding, InferenceError, ModelPayload};
use serde::Deserialize;
use serde_json::Value;

/// `{success, result, errors}` response wrapper
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

/// Map an HTTP status and body to the binding result
///
/// # Errors
/// - Envelope errors through [`InferenceError::from_provider`]
/// - Unstructured failures through [`InferenceError::from_message`]
/// - A successful envelope without `result` as `InvalidResponse`
pub fn parse_envelope(status: u16, body: &str) -> Result<Value, InferenceError> {
    let ok_status = (200..300).contains(&status);

    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(err) if ok_status => {
            return Err(InferenceError::invalid_response("response envelope", err.to_string()))
        }
        Err(_) => return Err(InferenceError::from_message(format!("HTTP {status}: {body}"))),
    };

    if ok_status && envelope.success {
        return envelope
            .result
            .ok_or_else(|| InferenceError::invalid_response("`result` in envelope", "missing"));
    }

    match envelope.errors.into_iter().next() {
        Some(ApiError { code, message }) => Err(InferenceError::from_provider(code, message)),
        None => Err(InferenceError::from_message(format!("HTTP {status}: {body}"))),
    }
}

/// Inference binding over the Workers AI REST API
#[derive(Debug, Clone)]
pub struct WorkersAiBinding {
    client: reqwest::Client,
    config: WorkersConfig,
}

impl WorkersAiBinding {
    /// Create binding
    ///
    /// # Errors
    /// Missing credentials or an HTTP client that cannot be built
    pub fn new(config: WorkersConfig) -> Result<Self, WorkersError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| WorkersError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl InferenceBinding for WorkersAiBinding {
    async fn run(&self, model: &str, payload: &ModelPayload) -> Result<Value, InferenceError> {
        let url = self.config.run_url(model);
        tracing::debug!(model, url = %url, "posting inference request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let result = parse_envelope(status, &body);
        if let Err(err) = &result {
            tracing::debug!(model, status, code = err.code(), "inference request failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn success_returns_result() {
        let body = r#"{"success":true,"result":{"response":"hello"},"errors":[],"messages":[]}"#;
        assert_eq!(parse_envelope(200, body).unwrap(), json!({ "response": "hello" }));
    }

    #[test]
    fn image_result_passes_through() {
        let body = r#"{"success":true,"result":{"image":"aGk="}}"#;
        assert_eq!(parse_envelope(200, body).unwrap()["image"], "aGk=");
    }

    #[test]
    fn overload_code_is_retryable() {
        let body = r#"{"success":false,"result":null,"errors":[{"code":1031,"message":"Capacity temporarily exceeded"}]}"#;
        let err = parse_envelope(429, body).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Capacity temporarily exceeded"));
    }

    #[test]
    fn other_codes_are_provider_errors() {
        let body = r#"{"success":false,"errors":[{"code":5007,"message":"No such model"}]}"#;
        assert_eq!(
            parse_envelope(400, body).unwrap_err(),
            InferenceError::Provider {
                code: Some(5007),
                message: "No such model".to_string()
            }
        );
    }

    #[test]
    fn unstructured_failure_uses_message_code() {
        let err = parse_envelope(503, "upstream busy, error code: 1031").unwrap_err();
        assert!(err.is_retryable());

        let err = parse_envelope(502, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.provider_code(), None);
        assert_eq!(err.code(), "provider");
    }

    #[test]
    fn success_without_result_is_invalid() {
        let err = parse_envelope(200, r#"{"success":true}"#).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse { .. }));
    }

    #[test]
    fn garbage_on_ok_status_is_invalid() {
        let err = parse_envelope(200, "not json").unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse { .. }));
    }

    #[test]
    fn new_requires_credentials() {
        let err = WorkersAiBinding::new(WorkersConfig::default()).unwrap_err();
        assert!(matches!(err, WorkersError::MissingCredential(_)));
        assert!(WorkersAiBinding::new(WorkersConfig::new("a", "t")).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let binding = WorkersAiBinding::new(
            WorkersConfig::new("a", "t").with_base_url("http://127.0.0.1:1"),
        )
        .unwrap();
        let err = binding
            .run("m", &ModelPayload::prompt("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "transport");
        assert!(!err.is_retryable());
    }
}
