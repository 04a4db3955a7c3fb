//! C4 — Streaming Tool-Call Accumulator.
//!
//! Stateful reassembly of tool-call fragments delivered across streaming
//! chunks (spec.md §4.4). One instance lives for exactly one stream; per
//! spec.md §9's design note it is owned by the stream iterator, never by
//! the adapter, so two concurrent streams from one adapter are
//! independent.

use agentbridge_domain::canonical::{Part, ToolCall};
use agentbridge_domain::stream::ToolCallFragment;
use std::collections::BTreeMap;

#[derive(Default)]
struct Entry {
    id: Option<String>,
    name: Option<String>,
    arguments_buffer: String,
}

/// Accumulates `tool_calls` deltas keyed by the wire-delivered index,
/// emitting one consolidated [`Part::ToolCall`] per index on stream
/// termination (spec.md §4.4, §8 property 3).
///
/// `BTreeMap` keeps insertion-order-by-index, which matches the "index 0
/// first" expectation of every OpenAI-family backend without needing a
/// separate ordering pass at finalize time.
#[derive(Default)]
pub struct StreamAccumulator {
    entries: BTreeMap<u32, Entry>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the accumulator. `id`/`name` overwrite when
    /// present (they normally arrive once, on the first fragment for an
    /// index); `arguments_fragment` is appended, never replacing, the
    /// running buffer — arguments arrive split across many chunks.
    pub fn ingest(&mut self, fragment: ToolCallFragment) {
        let entry = self.entries.entry(fragment.index).or_default();
        if let Some(id) = fragment.id {
            entry.id = Some(id);
        }
        if let Some(name) = fragment.name {
            entry.name = Some(name);
        }
        if let Some(args) = fragment.arguments_fragment {
            entry.arguments_buffer.push_str(&args);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the accumulator and emit one [`ToolCall`] per accumulated
    /// index, in index order. Arguments that fail to parse as JSON yield
    /// an empty object and are logged — the call is still emitted
    /// (spec.md §7 `ToolArgumentsUnparseable`, §8 boundary behaviour).
    ///
    /// Called at most once, when a chunk carries a non-null finish
    /// reason; the caller is responsible for not calling this twice.
    pub fn finalize(self) -> Vec<Part> {
        self.entries
            .into_iter()
            .map(|(index, entry)| {
                let args = if entry.arguments_buffer.is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    match serde_json::from_str(&entry.arguments_buffer) {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::warn!(
                                tool_call_index = index,
                                error = %e,
                                "tool-call arguments did not parse as JSON; emitting empty args"
                            );
                            serde_json::Value::Object(Default::default())
                        }
                    }
                };
                Part::ToolCall(ToolCall {
                    id: entry.id,
                    name: entry.name.unwrap_or_default(),
                    args,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ToolCallFragment {
        ToolCallFragment {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments_fragment: args.map(String::from),
        }
    }

    #[test]
    fn reassembles_fragmented_arguments_s3() {
        let mut acc = StreamAccumulator::new();
        acc.ingest(frag(0, Some("t1"), Some("runShell"), None));
        acc.ingest(frag(0, None, None, Some("{\"cmd\":")));
        acc.ingest(frag(0, None, None, Some("\"ls\"}")));

        let parts = acc.finalize();
        assert_eq!(parts.len(), 1);
        match &parts[0] {
            Part::ToolCall(tc) => {
                assert_eq!(tc.id.as_deref(), Some("t1"));
                assert_eq!(tc.name, "runShell");
                assert_eq!(tc.args, serde_json::json!({"cmd": "ls"}));
            }
            _ => panic!("expected a tool call part"),
        }
    }

    #[test]
    fn empty_arguments_buffer_yields_empty_object() {
        let mut acc = StreamAccumulator::new();
        acc.ingest(frag(0, Some("t1"), Some("noop"), None));
        let parts = acc.finalize();
        match &parts[0] {
            Part::ToolCall(tc) => assert_eq!(tc.args, serde_json::json!({})),
            _ => panic!("expected a tool call part"),
        }
    }

    #[test]
    fn unparseable_arguments_yield_empty_object_not_error() {
        let mut acc = StreamAccumulator::new();
        acc.ingest(frag(0, Some("t1"), Some("broken"), Some("{not json")));
        let parts = acc.finalize();
        match &parts[0] {
            Part::ToolCall(tc) => assert_eq!(tc.args, serde_json::json!({})),
            _ => panic!("expected a tool call part"),
        }
    }

    #[test]
    fn multiple_indices_emit_in_order() {
        let mut acc = StreamAccumulator::new();
        acc.ingest(frag(1, Some("t2"), Some("second"), Some("{}")));
        acc.ingest(frag(0, Some("t1"), Some("first"), Some("{}")));
        let parts = acc.finalize();
        assert_eq!(parts.len(), 2);
        match (&parts[0], &parts[1]) {
            (Part::ToolCall(a), Part::ToolCall(b)) => {
                assert_eq!(a.name, "first");
                assert_eq!(b.name, "second");
            }
            _ => panic!("expected two tool call parts"),
        }
    }

    #[test]
    fn each_tool_call_id_emitted_at_most_once() {
        let mut acc = StreamAccumulator::new();
        acc.ingest(frag(0, Some("t1"), Some("f"), Some("{}")));
        let parts = acc.finalize();
        assert_eq!(parts.len(), 1);
    }
}
