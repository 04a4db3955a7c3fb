//! The canonical `ContentGenerator` contract (spec.md §6) — the interface
//! the chat loop consumes. Every adapter (`openai_compat`, `anthropic`)
//! fulfils this trait; the chat loop never knows which wire format is
//! behind it.

use agentbridge_domain::canonical::{
    CountTokensResponse, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse,
};
use agentbridge_domain::error::Result;
use agentbridge_domain::stream::BoxStream;

/// Fulfilled by each adapter; constructed per request-generation session
/// by the registry/factory (C6) and discarded when the session ends or
/// the user switches provider/model (spec.md §3 "Lifecycle").
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Full, non-streaming generation.
    ///
    /// `prompt_id` mirrors spec.md §6's optional `promptId` argument — a
    /// caller-supplied correlation id threaded through for tracing only,
    /// never interpreted by the adapter.
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
        prompt_id: Option<&str>,
    ) -> Result<GenerateContentResponse>;

    /// Streaming generation. Each adapter instance owns no state across
    /// calls — the accumulator that reassembles tool-call fragments is
    /// owned by the returned stream, not by `self` (spec.md §9 design
    /// note: two concurrent streams from one adapter must be independent).
    ///
    /// `prompt_id` is tracing-only, as in [`Self::generate_content`].
    async fn generate_content_stream(
        &self,
        request: &GenerateContentRequest,
        prompt_id: Option<&str>,
    ) -> Result<BoxStream<'static, Result<agentbridge_domain::stream::StreamChunk>>>;

    /// Count tokens for `request`. Descriptors declaring
    /// `tokenCounting.method = response_usage` issue the real chat request
    /// and report `promptTokens`; `estimation` descriptors never touch the
    /// network (spec.md §4.5).
    async fn count_tokens(&self, request: &GenerateContentRequest) -> Result<CountTokensResponse>;

    /// Generate embeddings. Fails with `OperationUnsupported` when the
    /// descriptor declares no `endpoints.embedding` (spec.md §4.5).
    async fn embed_content(&self, request: &EmbedContentRequest) -> Result<EmbedContentResponse>;

    /// A short human-readable identifier for logging/diagnostics — not
    /// part of the canonical wire contract, but every adapter needs one.
    fn provider_id(&self) -> &str;
}
