//! The canonical content-generation vocabulary.
//!
//! This is the provider-agnostic request/response shape the chat loop
//! speaks; every adapter translates between this and its own wire format.
//! Modeled after the teacher's `sa_domain::tool` types, generalized from a
//! chat-message list to the content/parts shape a multi-modal, tool-calling
//! generator needs (inline binary parts, a separate system instruction, and
//! a `model` role instead of `assistant` so it stays wire-neutral).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Content / parts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of the conversation: a role plus an ordered list of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Join every text part with no separator (matches spec.md §4.3.1's
    /// "joined text" wording for plain-content messages).
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(Part::as_tool_call)
    }

    pub fn tool_responses(&self) -> impl Iterator<Item = &ToolResponse> {
        self.parts.iter().filter_map(Part::as_tool_response)
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }
}

/// One piece of content within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Part {
    #[serde(rename = "text")]
    Text(String),
    /// Inline binary data (images, audio) — mime type plus base64 payload.
    #[serde(rename = "inline_data")]
    InlineData { mime_type: String, data: String },
    #[serde(rename = "tool_call")]
    ToolCall(ToolCall),
    #[serde(rename = "tool_response")]
    ToolResponse(ToolResponse),
}

impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            Part::ToolCall(tc) => Some(tc),
            _ => None,
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        match self {
            Part::ToolResponse(tr) => Some(tr),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Part::InlineData { mime_type, .. } if mime_type.starts_with("image/"))
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id. `None` only ever occurs transiently while building a
    /// request from an in-progress stream; translated output always
    /// assigns one (`call_<index>` when the wire omitted it).
    pub id: Option<String>,
    pub name: String,
    pub args: serde_json::Value,
}

/// The host's answer to a prior [`ToolCall`], referenced by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub response: serde_json::Value,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool declarations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `{name, description, parameters}` — a single function the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON-Schema-like parameter description. Coerced (types lower-cased,
    /// stringly-typed numeric constraints parsed) during outbound
    /// translation — see `providers::translate::schema`.
    pub parameters: serde_json::Value,
}

/// A thunk that yields a [`ToolDeclaration`] on demand.
///
/// Modeled per spec.md §9's design note: some callers hold a declaration
/// directly, others hold an object that computes/loads it lazily (e.g. a
/// declaration assembled from a running MCP server's tool list). Both
/// shapes normalize to a `ToolDeclaration` once per outbound request.
pub type DeclarationThunk = Arc<dyn Fn() -> ToolDeclaration + Send + Sync>;

/// A tool as handed to the translator: either a direct declaration or a
/// callable wrapper that must be resolved once before translation.
#[derive(Clone)]
pub enum ToolSource {
    Direct(ToolDeclaration),
    Callable(DeclarationThunk),
}

impl ToolSource {
    /// Evaluate the thunk if necessary. Called once per outbound request
    /// construction, never cached across requests (the thunk may reflect
    /// a tool list that changes between calls).
    pub fn resolve(&self) -> ToolDeclaration {
        match self {
            ToolSource::Direct(decl) => decl.clone(),
            ToolSource::Callable(thunk) => thunk(),
        }
    }
}

impl std::fmt::Debug for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolSource::Direct(d) => f.debug_tuple("Direct").field(&d.name).finish(),
            ToolSource::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generation config / requests / responses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Canonical generation parameters. Field names match spec.md §3's
/// `parameterMapping` keys; each is translated to the wire name the
/// descriptor declares, only when present.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    /// When `Some("application/json")`, the translator appends a strict-JSON
    /// instruction to the last user message and sets the wire JSON-mode
    /// field (spec.md §4.3.3).
    pub response_mime_type: Option<String>,
    pub tools: Vec<ToolSource>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    pub config: GenerationConfig,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other,
}

impl FinishReason {
    /// The fixed OpenAI-family mapping table from spec.md §4.3.4.
    pub fn from_openai(wire: &str) -> Self {
        match wire {
            "stop" | "tool_calls" => FinishReason::Stop,
            "length" => FinishReason::MaxTokens,
            "content_filter" => FinishReason::Safety,
            _ => FinishReason::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub content: Content,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub model: String,
}

impl GenerateContentResponse {
    /// Convenience accessor mirroring the round-trip property in spec.md
    /// §8: the joined text of the first candidate, or empty string.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.joined_text())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmbedContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone)]
pub struct ContentEmbedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct EmbedContentResponse {
    pub embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CountTokensResponse {
    pub total_tokens: u32,
}

/// Per-model resolved feature flags, after C2 deep-merge of descriptor
/// defaults with user overrides (spec.md §4.2, §8 property 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelFeatures {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub function_calling: bool,
    #[serde(default)]
    pub vision: bool,
}

/// Fully-resolved per-model configuration, the return type of
/// `resolveModelConfig` (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedModel {
    pub display_name: String,
    pub context_window: u32,
    pub max_output_tokens: u32,
    #[serde(default)]
    pub supported_modalities: Vec<String>,
    pub features: ModelFeatures,
}

/// Handy alias — a plain string-keyed JSON map, used anywhere the spec
/// talks about "deep merge this object with that object".
pub type JsonMap = HashMap<String, serde_json::Value>;
