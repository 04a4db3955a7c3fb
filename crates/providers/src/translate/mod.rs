//! C3 — Canonical ↔ Wire Translator.
//!
//! Bidirectional format conversion for messages, tool declarations, tool
//! calls, tool results, parameters, finish-reasons, and usage metadata
//! (spec.md §4.3). `openai` covers the OpenAI-family wire format in full;
//! `anthropic` is a structural stub (spec.md §9 Open Questions — the
//! source's Anthropic adapter is itself a stub, and a full Anthropic
//! translator is future work).

pub mod anthropic;
pub mod openai;
