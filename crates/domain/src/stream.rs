use crate::canonical::{FinishReason, Part, UsageMetadata};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// One element of a `generateContentStream` sequence — the externally
/// visible contract (spec.md §6).
///
/// Per spec.md §4.4 (C4), this is always the *consolidated* view: a chunk
/// may carry a bare text part as soon as it arrives, but tool-call parts
/// never appear until the terminal chunk, fully assembled. There is no
/// "tool call started" / "tool call delta" event in this contract — those
/// are wire-level concepts internal to `providers::accumulator`.
#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    pub parts: Vec<Part>,
    pub finish_reason: Option<FinishReason>,
    pub usage_metadata: Option<UsageMetadata>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
            finish_reason: None,
            usage_metadata: None,
        }
    }
}

/// A raw, not-yet-consolidated tool-call fragment as delivered by a
/// streaming wire format. Consumed only by `providers::accumulator`;
/// never exposed past it.
#[derive(Debug, Clone, Default)]
pub struct ToolCallFragment {
    /// Index the wire protocol uses to correlate fragments belonging to
    /// the same call across chunks (spec.md §4.4).
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Argument JSON text fragment. Appended, never replacing, the
    /// accumulator's buffer for this index.
    pub arguments_fragment: Option<String>,
}
