//! The Anthropic Messages-API adapter — a structural stub (spec.md §9 Open
//! Questions: the source's Anthropic adapter is itself a stub). Proves the
//! descriptor-driven factory generalizes past the OpenAI family with a
//! genuinely different wire shape (system prompt lifted out of the
//! message list, no `tool_calls`/`delta` vocabulary) without committing to
//! full tool-calling or streaming support for it.

use crate::config_resolver::{resolve_headers, resolve_timeout_ms};
use crate::transport::Transport;
use crate::translate::anthropic as wire;
use agentbridge_domain::canonical::{
    CountTokensResponse, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse,
};
use agentbridge_domain::descriptor::AdapterDescriptor;
use agentbridge_domain::error::{Error, Result};
use agentbridge_domain::record::UserProviderRecord;
use agentbridge_domain::stream::BoxStream;
use std::sync::Arc;

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicAdapter {
    id: String,
    base_url: String,
    descriptor: Arc<AdapterDescriptor>,
    record: UserProviderRecord,
    transport: Transport,
}

impl AnthropicAdapter {
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
}

#[async_trait::async_trait]
impl crate::traits::ContentGenerator for AnthropicAdapter {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
        prompt_id: Option<&str>,
    ) -> Result<GenerateContentResponse> {
        if let Some(id) = prompt_id {
            tracing::debug!(provider = %self.id, prompt_id = %id, "generate_content");
        }
        let url = self.endpoint_url("chat")?;
        let headers = resolve_headers(&self.descriptor, &self.record);
        let body = wire::build_request_body(request, DEFAULT_MAX_TOKENS);
        let response_body = self
            .transport
            .post_json(&url, &headers, &body, &self.descriptor)
            .await?;
        Ok(wire::parse_response(&response_body, &request.model))
    }

    async fn generate_content_stream(
        &self,
        _request: &GenerateContentRequest,
        _prompt_id: Option<&str>,
    ) -> Result<BoxStream<'static, Result<agentbridge_domain::stream::StreamChunk>>> {
        Err(Error::OperationUnsupported {
            provider: self.id.clone(),
            operation: "generateContentStream".into(),
        })
    }

    async fn count_tokens(&self, request: &GenerateContentRequest) -> Result<CountTokensResponse> {
        let serialized_len: usize = request.contents.iter().map(|c| c.joined_text().len()).sum();
        Ok(CountTokensResponse {
            total_tokens: ((serialized_len as f64) / 4.0).ceil() as u32,
        })
    }

    async fn embed_content(&self, _request: &EmbedContentRequest) -> Result<EmbedContentResponse> {
        Err(Error::OperationUnsupported {
            provider: self.id.clone(),
            operation: "embedContent".into(),
        })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
