//! The OpenAI-family adapter.
//!
//! Works with OpenAI itself and any OpenAI-compatible gateway (Azure
//! OpenAI, DeepSeek, Qwen, local vLLM/Ollama/LM Studio endpoints, and so
//! on). Per spec, all of that variance — URL layout, header names, field
//! names, model catalogue — is expressed in the adapter descriptor; this
//! struct contains no backend-specific branches.

use crate::config_resolver::{resolve_api_key, resolve_headers, resolve_timeout_ms};
use crate::translate::openai as wire;
use crate::transport::Transport;
use agentbridge_domain::canonical::{
    CountTokensResponse, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse,
};
use agentbridge_domain::descriptor::{AdapterDescriptor, TokenCountingMethod};
use agentbridge_domain::error::{Error, Result};
use agentbridge_domain::record::UserProviderRecord;
use agentbridge_domain::stream::BoxStream;
use std::sync::Arc;

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Bound to one `UserProviderRecord` at construction time (spec.md §4.6);
/// holds no state across requests beyond the shared HTTP client, so two
/// adapter instances built from equal records behave identically.
pub struct OpenAiCompatAdapter {
    id: String,
    base_url: String,
    descriptor: Arc<AdapterDescriptor>,
    record: UserProviderRecord,
    transport: Transport,
}

impl OpenAiCompatAdapter {
    pub fn new(descriptor: Arc<AdapterDescriptor>, record: UserProviderRecord) -> Result<Self> {
        let timeout_ms = resolve_timeout_ms(&record, DEFAULT_TIMEOUT_MS);
        let transport = Transport::new(record.id.clone(), timeout_ms)?;
        Ok(Self {
            id: record.id.clone(),
            base_url: record.base_url.trim_end_matches('/').to_string(),
            descriptor,
            record,
            transport,
        })
    }

    fn endpoint_url(&self, logical: &str) -> Result<String> {
        let path = self.descriptor.endpoints.get(logical).ok_or_else(|| {
            Error::OperationUnsupported {
                provider: self.id.clone(),
                operation: logical.to_string(),
            }
        })?;
        Ok(format!("{}{}", self.base_url, path))
    }

    /// The resolved model's declared modality list (spec.md §3
    /// `ResolvedModel.supportedModalities`), falling back to an empty list
    /// when `request.model` resolves to no known model — a conservative
    /// default that keeps image inlining off rather than guessing
    /// (spec.md §4.3.1 point 3).
    fn supported_modalities(&self, request: &GenerateContentRequest) -> Vec<String> {
        crate::config_resolver::resolve_model_config(&self.descriptor, &self.record, &request.model)
            .map(|m| m.supported_modalities)
            .unwrap_or_default()
    }

    fn headers(&self) -> std::collections::HashMap<String, String> {
        resolve_headers(&self.descriptor, &self.record)
    }
}

#[async_trait::async_trait]
impl crate::traits::ContentGenerator for OpenAiCompatAdapter {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
        prompt_id: Option<&str>,
    ) -> Result<GenerateContentResponse> {
        if let Some(id) = prompt_id {
            tracing::debug!(provider = %self.id, prompt_id = %id, "generate_content");
        }
        let url = self.endpoint_url("chat")?;
        let body = wire::build_request_body(&self.descriptor, request, false, &self.supported_modalities(request));
        let response_body = self
            .transport
            .post_json(&url, &self.headers(), &body, &self.descriptor)
            .await?;
        Ok(wire::parse_response(&self.descriptor, &response_body, &request.model))
    }

    async fn generate_content_stream(
        &self,
        request: &GenerateContentRequest,
        prompt_id: Option<&str>,
    ) -> Result<BoxStream<'static, Result<agentbridge_domain::stream::StreamChunk>>> {
        if let Some(id) = prompt_id {
            tracing::debug!(provider = %self.id, prompt_id = %id, "generate_content_stream");
        }
        let url = self.endpoint_url("chat")?;
        let body = wire::build_request_body(&self.descriptor, request, true, &self.supported_modalities(request));
        let response = self
            .transport
            .post_stream(&url, &self.headers(), &body, &self.descriptor)
            .await?;

        let descriptor = self.descriptor.clone();
        let mut accumulator = crate::accumulator::StreamAccumulator::new();

        Ok(crate::sse::sse_json_stream(response, self.id.clone(), move |value| {
            wire::fold_stream_chunk(&descriptor, value, &mut accumulator)
        }))
    }

    async fn count_tokens(&self, request: &GenerateContentRequest) -> Result<CountTokensResponse> {
        match self.descriptor.token_counting.method {
            TokenCountingMethod::ResponseUsage => match self.generate_content(request, None).await {
                Ok(response) => {
                    let total = response
                        .usage_metadata
                        .map(|u| u.prompt_tokens)
                        .unwrap_or_else(|| estimate_tokens(&self.descriptor, request));
                    Ok(CountTokensResponse { total_tokens: total })
                }
                Err(_) => Ok(CountTokensResponse {
                    total_tokens: estimate_tokens(&self.descriptor, request),
                }),
            },
            TokenCountingMethod::Estimation => Ok(CountTokensResponse {
                total_tokens: estimate_tokens(&self.descriptor, request),
            }),
        }
    }

    async fn embed_content(&self, request: &EmbedContentRequest) -> Result<EmbedContentResponse> {
        let url = self.endpoint_url("embedding")?;
        let flattened: String = request
            .contents
            .iter()
            .map(|c| c.joined_text())
            .collect::<Vec<_>>()
            .join("\n");

        let body = serde_json::json!({"model": EMBEDDING_MODEL, "input": flattened});
        let response_body = self
            .transport
            .post_json(&url, &self.headers(), &body, &self.descriptor)
            .await?;

        let values: Vec<f32> = response_body
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"))
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            .ok_or_else(|| Error::MalformedResponse {
                provider: self.id.clone(),
                reason: "response missing data[0].embedding".into(),
            })?;

        Ok(EmbedContentResponse {
            embeddings: vec![agentbridge_domain::canonical::ContentEmbedding { values }],
        })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

/// spec.md §4.5 fallback: `ceil(serialized(contents).length / 4)`. The
/// descriptor's `fallbackEstimation` weights are reserved for a richer
/// heuristic; only `baseRatio` (fixed at 4.0 here per the mandatory
/// behaviour) is used today.
fn estimate_tokens(_descriptor: &AdapterDescriptor, request: &GenerateContentRequest) -> u32 {
    let serialized_len: usize = request.contents.iter().map(|c| c.joined_text().len()).sum();
    ((serialized_len as f64) / 4.0).ceil() as u32
}
