//! Shared SSE streaming infrastructure for all provider adapters.
//!
//! Every provider follows the same pattern: receive a `reqwest::Response`,
//! buffer chunks, split on `\n\n`, extract `data:` payloads, and feed each
//! payload (parsed as JSON) to a provider-specific folding closure that
//! returns the next consolidated [`StreamChunk`], if any.
//!
//! This module extracts that shared logic into two pieces:
//! - [`drain_data_lines`] — pull complete `data:` payloads from an SSE buffer
//! - [`sse_json_stream`] — build a `BoxStream` from a response + a fold closure

use crate::util::classify_reqwest_error;
use agentbridge_domain::error::Result;
use agentbridge_domain::stream::{BoxStream, StreamChunk};
use serde_json::Value;

const DONE_SENTINEL: &str = "[DONE]";

/// Extract complete `data:` payloads from an SSE buffer.
///
/// SSE events are delimited by `\n\n`. Each event block may contain
/// `event:`, `data:`, `id:`, or `retry:` lines. We only care about
/// `data:` lines.
///
/// The buffer is drained in-place: consumed bytes are removed and any
/// trailing partial event remains for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2); // remove the \n\n delimiter

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Build a [`BoxStream`] of consolidated [`StreamChunk`]s from an SSE
/// `reqwest::Response` and a provider-specific fold closure.
///
/// `on_event` receives each `data:` payload parsed as JSON and returns the
/// next chunk to emit, if the payload produced one (spec.md §4.4: a bare
/// text delta emits immediately, a tool-call fragment emits nothing until
/// the terminal chunk). It owns whatever per-stream state it needs (e.g. a
/// `StreamAccumulator`) so concurrent streams never share state.
///
/// The `[DONE]` sentinel some backends send as a final literal (not JSON)
/// payload is swallowed silently. A payload that fails to parse as JSON is
/// logged and skipped rather than failing the whole stream (spec.md §7's
/// swallow-and-continue policy for malformed fragments).
pub(crate) fn sse_json_stream<F>(
    response: reqwest::Response,
    provider: String,
    mut on_event: F,
) -> BoxStream<'static, Result<StreamChunk>>
where
    F: FnMut(&Value) -> Option<StreamChunk> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();

        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    for data in drain_data_lines(&mut buffer) {
                        if data == DONE_SENTINEL {
                            continue;
                        }
                        match serde_json::from_str::<Value>(&data) {
                            Ok(value) => {
                                if let Some(chunk) = on_event(&value) {
                                    yield Ok(chunk);
                                }
                            }
                            Err(e) => {
                                tracing::warn!(provider = %provider, error = %e, "skipping malformed SSE payload");
                            }
                        }
                    }
                }
                Ok(None) => {
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for data in drain_data_lines(&mut buffer) {
                            if data == DONE_SENTINEL {
                                continue;
                            }
                            if let Ok(value) = serde_json::from_str::<Value>(&data) {
                                if let Some(chunk) = on_event(&value) {
                                    yield Ok(chunk);
                                }
                            }
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(classify_reqwest_error(&provider, e));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_single_complete_event() {
        let mut buf = String::from("event: message\ndata: {\"hello\":\"world\"}\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["{\"hello\":\"world\"}"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_multiple_events() {
        let mut buf = String::from("data: first\n\ndata: second\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["first", "second"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_partial_event_stays_in_buffer() {
        let mut buf = String::from("data: complete\n\ndata: partial");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["complete"]);
        assert_eq!(buf, "data: partial");
    }

    #[test]
    fn drain_empty_buffer() {
        let mut buf = String::new();
        let lines = drain_data_lines(&mut buf);
        assert!(lines.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_skips_empty_data_lines() {
        let mut buf = String::from("data: \n\n");
        let lines = drain_data_lines(&mut buf);
        assert!(lines.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_ignores_non_data_lines() {
        let mut buf = String::from("event: ping\nid: 42\nretry: 5000\ndata: payload\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["payload"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_done_sentinel_preserved() {
        let mut buf = String::from("data: [DONE]\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["[DONE]"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_handles_whitespace_after_data_prefix() {
        let mut buf = String::from("data:   {\"key\":\"val\"}  \n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["{\"key\":\"val\"}"]);
    }

    #[test]
    fn drain_incremental_buffering() {
        let mut buf = String::from("data: chunk1");
        let lines = drain_data_lines(&mut buf);
        assert!(lines.is_empty());
        assert_eq!(buf, "data: chunk1");

        buf.push_str("\n\ndata: chunk2\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["chunk1", "chunk2"]);
        assert!(buf.is_empty());
    }
}
