//! C5 — HTTP Transport & Error Classifier (spec.md §4.5).
//!
//! Thin wrapper around a shared `reqwest::Client`: issues the request,
//! classifies non-2xx responses into the right `domain::error::Error`
//! variant using the descriptor's `errorHandling` status lists, and
//! classifies transport-level failures (timeouts, connection errors) via
//! `util::classify_reqwest_error`.

use crate::util::{classify_reqwest_error, mask_secrets};
use agentbridge_domain::descriptor::AdapterDescriptor;
use agentbridge_domain::error::{Error, Result};
use reqwest::{Client, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Issues descriptor-driven HTTP calls for one provider, sharing a single
/// `reqwest::Client` (connection pooling) across every request the
/// adapter makes.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    provider: String,
}

impl Transport {
    pub fn new(provider: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            provider: provider.into(),
        })
    }

    /// POST `body` as JSON to `url` with `headers`, returning the parsed
    /// JSON response body or a classified [`Error`] on non-2xx / transport
    /// failure.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
        descriptor: &AdapterDescriptor,
    ) -> Result<Value> {
        let response = self.send(url, headers, body).await?;
        self.parse_or_classify(response, descriptor).await
    }

    /// POST `body` and return the raw streaming [`Response`] (caller owns
    /// SSE decoding), classifying non-2xx responses the same way
    /// [`Transport::post_json`] does before handing back the body stream.
    ///
    /// spec.md §5 requires a timeout during streaming setup to surface a
    /// diagnostic distinct from a non-streaming timeout, so a transport
    /// timeout hit while establishing the stream is re-tagged with a
    /// "streaming setup timeout" prefix before it reaches the caller.
    pub async fn post_stream(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
        descriptor: &AdapterDescriptor,
    ) -> Result<Response> {
        let response = self
            .send(url, headers, body)
            .await
            .map_err(Self::mark_streaming_setup_timeout)?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(self.classify_status(status, &text, descriptor))
    }

    /// Re-tag a [`Error::ProviderTimeout`] raised while establishing a
    /// streaming request so it reads as a streaming-setup timeout rather
    /// than the generic (non-streaming) timeout diagnostic.
    fn mark_streaming_setup_timeout(error: Error) -> Error {
        match error {
            Error::ProviderTimeout { provider, message } => Error::ProviderTimeout {
                provider,
                message: format!("streaming setup timeout: {message}"),
            },
            other => other,
        }
    }

    async fn send(&self, url: &str, headers: &HashMap<String, String>, body: &Value) -> Result<Response> {
        let mut request = self.client.post(url).json(body);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        request
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&self.provider, e))
    }

    async fn parse_or_classify(&self, response: Response, descriptor: &AdapterDescriptor) -> Result<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&self.provider, e))?;

        if !status.is_success() {
            return Err(self.classify_status(status.as_u16(), &text, descriptor));
        }

        serde_json::from_str(&text).map_err(|_| Error::MalformedResponse {
            provider: self.provider.clone(),
            reason: format!("response body was not valid JSON: {}", mask_secrets(&text)),
        })
    }

    /// spec.md §4.5 — classify a non-2xx status using the descriptor's
    /// status lists, falling back to a generic HTTP error. Checked in
    /// order auth → rate limit → quota, since a status code can legally
    /// appear in more than one list for a lenient descriptor.
    fn classify_status(&self, status: u16, body: &str, descriptor: &AdapterDescriptor) -> Error {
        let message = descriptor
            .error_handling
            .error_message_path
            .as_deref()
            .and_then(|path| serde_json::from_str::<Value>(body).ok().map(|v| (v, path.to_string())))
            .and_then(|(v, path)| {
                crate::util::resolve_json_path(&v, &path)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| mask_secrets(body));

        let rules = &descriptor.error_handling;
        if rules.auth_error_status.contains(&status) {
            Error::ProviderAuthError {
                provider: self.provider.clone(),
                status,
                message,
            }
        } else if rules.rate_limit_status.contains(&status) || rules.quota_error_status.contains(&status) {
            Error::ProviderRateLimited {
                provider: self.provider.clone(),
                status,
                message,
            }
        } else {
            Error::ProviderHttpError {
                provider: self.provider.clone(),
                status,
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentbridge_domain::descriptor::ErrorHandling;

    fn descriptor_with(error_handling: ErrorHandling) -> AdapterDescriptor {
        use agentbridge_domain::descriptor::*;
        AdapterDescriptor {
            adapter_type: "openai".into(),
            endpoints: Default::default(),
            parameter_mapping: Default::default(),
            response_mapping: ResponseMapping {
                content: "choices[0].message.content".into(),
                finish_reason: "choices[0].finish_reason".into(),
                usage: UsagePaths {
                    prompt_tokens: "usage.prompt_tokens".into(),
                    completion_tokens: "usage.completion_tokens".into(),
                    total_tokens: "usage.total_tokens".into(),
                },
                streaming: None,
            },
            token_counting: TokenCounting {
                method: TokenCountingMethod::ResponseUsage,
                fallback_estimation: Default::default(),
            },
            error_handling,
            request_headers: Default::default(),
            default_models: Default::default(),
            json_mode_prompt_rewrite: true,
        }
    }

    #[test]
    fn classifies_auth_status_before_rate_limit() {
        let transport = Transport::new("openai", 5000).unwrap();
        let descriptor = descriptor_with(ErrorHandling {
            auth_error_status: vec![401],
            rate_limit_status: vec![401, 429],
            quota_error_status: vec![],
            error_message_path: None,
        });
        match transport.classify_status(401, "unauthorized", &descriptor) {
            Error::ProviderAuthError { status, .. } => assert_eq!(status, 401),
            other => panic!("expected ProviderAuthError, got {other:?}"),
        }
    }

    #[test]
    fn classifies_rate_limit_status() {
        let transport = Transport::new("openai", 5000).unwrap();
        let descriptor = descriptor_with(ErrorHandling {
            auth_error_status: vec![401],
            rate_limit_status: vec![429],
            quota_error_status: vec![],
            error_message_path: None,
        });
        match transport.classify_status(429, "slow down", &descriptor) {
            Error::ProviderRateLimited { status, .. } => assert_eq!(status, 429),
            other => panic!("expected ProviderRateLimited, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_status_falls_back_to_generic_http_error() {
        let transport = Transport::new("openai", 5000).unwrap();
        let descriptor = descriptor_with(ErrorHandling::default());
        match transport.classify_status(500, "boom", &descriptor) {
            Error::ProviderHttpError { status, .. } => assert_eq!(status, 500),
            other => panic!("expected ProviderHttpError, got {other:?}"),
        }
    }

    #[test]
    fn extracts_message_via_error_message_path() {
        let transport = Transport::new("openai", 5000).unwrap();
        let descriptor = descriptor_with(ErrorHandling {
            auth_error_status: vec![401],
            rate_limit_status: vec![],
            quota_error_status: vec![],
            error_message_path: Some("error.message".into()),
        });
        let body = r#"{"error":{"message":"invalid api key"}}"#;
        match transport.classify_status(401, body, &descriptor) {
            Error::ProviderAuthError { message, .. } => assert_eq!(message, "invalid api key"),
            other => panic!("expected ProviderAuthError, got {other:?}"),
        }
    }

    #[test]
    fn streaming_setup_timeout_gets_distinct_diagnostic() {
        let error = Error::ProviderTimeout {
            provider: "openai".into(),
            message: "operation timed out".into(),
        };
        match Transport::mark_streaming_setup_timeout(error) {
            Error::ProviderTimeout { message, .. } => {
                assert!(message.starts_with("streaming setup timeout:"));
            }
            other => panic!("expected ProviderTimeout, got {other:?}"),
        }
    }

    #[test]
    fn non_timeout_error_passes_through_streaming_setup_marker_unchanged() {
        let error = Error::Http("connection refused".into());
        match Transport::mark_streaming_setup_timeout(error) {
            Error::Http(message) => assert_eq!(message, "connection refused"),
            other => panic!("expected Http, got {other:?}"),
        }
    }
}
