//! OpenAI-family wire translation (spec.md §4.3) — request body
//! construction (outbound) and response parsing (inbound, both full and
//! streaming). Shared by every OpenAI-compatible backend; the descriptor
//! supplies the only per-backend variance (paths, parameter names,
//! headers, endpoints).

use crate::accumulator::StreamAccumulator;
use crate::util::{resolve_json_path, resolve_usage_expression};
use agentbridge_domain::canonical::{
    Content, FinishReason, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, Role, UsageMetadata,
};
use agentbridge_domain::descriptor::AdapterDescriptor;
use agentbridge_domain::stream::{StreamChunk, ToolCallFragment};
use serde_json::{json, Map, Value};

const JSON_MODE_INSTRUCTION: &str =
    "Respond with a single valid JSON object only. Do not include commentary, explanation, or markdown code fences.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound — §4.3.1 / §4.3.2 / §4.3.3
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the full OpenAI-family chat request body for `request`, given
/// `descriptor`'s parameter/endpoint mapping. `stream` toggles the wire
/// `"stream"` flag.
pub fn build_request_body(
    descriptor: &AdapterDescriptor,
    request: &GenerateContentRequest,
    stream: bool,
    supported_modalities: &[String],
) -> Value {
    let mut messages = outbound_messages(request, supported_modalities);

    let mut body = json!({
        "model": request.model,
        "messages": Value::Array(Vec::new()),
        "stream": stream,
    });

    apply_parameters(&mut body, descriptor, &request.config);

    if !request.config.tools.is_empty() {
        body["tools"] = Value::Array(outbound_tools(&request.config));
    }

    apply_json_mode(&mut body, &mut messages, descriptor, &request.config);

    body["messages"] = Value::Array(messages);
    body
}

/// §4.3.1 — partition each content entry by part kind and emit the
/// corresponding wire message(s). `systemInstruction` is prepended last
/// of all (as message index 0) once the per-content messages are built.
///
/// `supported_modalities` is the resolved model's declared modality list
/// (spec.md §3 `ResolvedModel`); plain-content images are only inlined
/// when it includes `"image"` (spec.md §4.3.1 point 3's second conjunct).
fn outbound_messages(request: &GenerateContentRequest, supported_modalities: &[String]) -> Vec<Value> {
    let mut messages = Vec::new();
    let supports_image = supported_modalities.iter().any(|m| m == "image");

    if let Some(system) = &request.system_instruction {
        messages.push(json!({"role": "system", "content": system}));
    }

    for content in &request.contents {
        let tool_responses: Vec<_> = content.tool_responses().collect();
        if !tool_responses.is_empty() {
            for tr in tool_responses {
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": tr.id,
                    "content": stringify_response(&tr.response),
                }));
            }
            continue;
        }

        if content.has_tool_calls() {
            messages.push(assistant_tool_call_message(content));
            continue;
        }

        messages.push(plain_message(content, supports_image));
    }

    messages
}

/// Tool-response payloads stringify as-is for strings, JSON-serialize
/// otherwise (spec.md §4.3.1 point 1).
fn stringify_response(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// §4.3.1 point 2 — a model-role content carrying one or more tool-call
/// parts becomes one `assistant` message with `tool_calls` populated and
/// `content` set to the joined text (or `null` when there is none).
fn assistant_tool_call_message(content: &Content) -> Value {
    let text = content.joined_text();
    let tool_calls: Vec<Value> = content
        .tool_calls()
        .enumerate()
        .map(|(index, call)| {
            let id = call
                .id
                .clone()
                .unwrap_or_else(|| format!("call_{index}"));
            json!({
                "id": id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": call.args.to_string(),
                }
            })
        })
        .collect();

    json!({
        "role": "assistant",
        "content": if text.is_empty() { Value::Null } else { Value::String(text) },
        "tool_calls": tool_calls,
    })
}

/// §4.3.1 point 3 — plain content. A role of `model` maps to `assistant`,
/// `user` stays `user`. Images are only inlined as a multi-part body when
/// at least one inline image part is present **and** `supports_image` is
/// true (the resolved model's declared modalities include `"image"`);
/// otherwise — including text-only content — the message stays the
/// simple `{role, content: "..."}` shape the wire format expects, so a
/// text-only backend is never sent a multi-part image body it would
/// reject.
fn plain_message(content: &Content, supports_image: bool) -> Value {
    let role = match content.role {
        Role::Model => "assistant",
        Role::User => "user",
    };
    let text = content.joined_text();

    let has_image = supports_image && content.parts.iter().any(Part::is_image);
    if !has_image {
        return json!({"role": role, "content": text});
    }

    let mut parts_json = Vec::new();
    if !text.is_empty() {
        parts_json.push(json!({"type": "text", "text": text}));
    }
    for part in &content.parts {
        if let Part::InlineData { mime_type, data } = part {
            if mime_type.starts_with("image/") {
                parts_json.push(json!({
                    "type": "image_url",
                    "image_url": {"url": format!("data:{mime_type};base64,{data}")}
                }));
            }
        }
    }
    json!({"role": role, "content": Value::Array(parts_json)})
}

/// §4.3.2 — expand each tool declaration (resolving callables) into one
/// wire `{type:"function", function:{...}}` entry.
fn outbound_tools(config: &GenerationConfig) -> Vec<Value> {
    config
        .tools
        .iter()
        .map(|source| {
            let decl = source.resolve();
            json!({
                "type": "function",
                "function": {
                    "name": decl.name,
                    "description": decl.description,
                    "parameters": coerce_schema(&decl.parameters),
                }
            })
        })
        .collect()
}

/// §4.3.2 schema conversion — lower-case `type`, coerce stringly-typed
/// numeric/length constraints, recurse into nested objects/arrays,
/// leave everything else untouched.
pub fn coerce_schema(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                let converted = match key.as_str() {
                    "type" => match val {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => coerce_schema(other),
                    },
                    "minimum" | "maximum" | "multipleOf" => coerce_number(val),
                    "minLength" | "maxLength" | "minItems" | "maxItems" => coerce_integer(val),
                    _ => coerce_schema(val),
                };
                out.insert(key.clone(), converted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(coerce_schema).collect()),
        other => other.clone(),
    }
}

fn coerce_number(value: &Value) -> Value {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn coerce_integer(value: &Value) -> Value {
    match value {
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// §4.3.3 — emit the wire parameter named in `descriptor.parameterMapping`
/// for each canonical generation parameter that is present.
fn apply_parameters(body: &mut Value, descriptor: &AdapterDescriptor, config: &GenerationConfig) {
    let mut set = |canonical: &str, value: Value| {
        if let Some(wire_key) = descriptor.parameter_mapping.get(canonical) {
            body[wire_key.as_str()] = value;
        }
    };
    if let Some(t) = config.temperature {
        set("temperature", json!(t));
    }
    if let Some(p) = config.top_p {
        set("topP", json!(p));
    }
    if let Some(m) = config.max_output_tokens {
        set("maxOutputTokens", json!(m));
    }
    if !config.stop_sequences.is_empty() {
        set("stopSequences", json!(config.stop_sequences));
    }
    if let Some(p) = config.presence_penalty {
        set("presencePenalty", json!(p));
    }
    if let Some(f) = config.frequency_penalty {
        set("frequencyPenalty", json!(f));
    }
}

/// §4.3.3(b) / §9 "embedded JSON-mode prompt-rewriting hack" — gated
/// behind `descriptor.jsonModePromptRewrite` so wire formats with native
/// structured output can skip the message rewrite while still setting
/// `response_format`.
fn apply_json_mode(
    body: &mut Value,
    messages: &mut [Value],
    descriptor: &AdapterDescriptor,
    config: &GenerationConfig,
) {
    if config.response_mime_type.as_deref() != Some("application/json") {
        return;
    }
    body["response_format"] = json!({"type": "json_object"});

    if !descriptor.json_mode_prompt_rewrite {
        return;
    }

    if let Some(last_user) = messages
        .iter_mut()
        .rev()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
    {
        match last_user.get_mut("content") {
            Some(Value::String(text)) => {
                text.push_str("\n\n");
                text.push_str(JSON_MODE_INSTRUCTION);
            }
            Some(Value::Array(parts)) => {
                parts.push(json!({"type": "text", "text": JSON_MODE_INSTRUCTION}));
            }
            _ => {
                last_user["content"] = Value::String(JSON_MODE_INSTRUCTION.to_string());
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound — §4.3.4 (non-streaming)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a full (non-streaming) OpenAI-family response body into the
/// canonical response shape, walking `descriptor.responseMapping` paths.
pub fn parse_response(
    descriptor: &AdapterDescriptor,
    body: &Value,
    fallback_model: &str,
) -> GenerateContentResponse {
    let content_path = &descriptor.response_mapping.content;
    let text = resolve_json_path(body, content_path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let message = parent_path(content_path).and_then(|p| resolve_json_path(body, p));
    let tool_calls = message
        .and_then(|m| m.get("tool_calls"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut parts = Vec::new();
    if let Some(text) = text {
        parts.push(Part::Text(text));
    }
    for tc in &tool_calls {
        parts.push(tool_call_part(tc));
    }

    let finish_reason_wire = resolve_json_path(body, &descriptor.response_mapping.finish_reason)
        .and_then(Value::as_str);
    let finish_reason = finish_reason_wire.map(FinishReason::from_openai);

    let usage = UsageMetadata {
        prompt_tokens: resolve_usage_expression(body, &descriptor.response_mapping.usage.prompt_tokens) as u32,
        completion_tokens: resolve_usage_expression(
            body,
            &descriptor.response_mapping.usage.completion_tokens,
        ) as u32,
        total_tokens: resolve_usage_expression(body, &descriptor.response_mapping.usage.total_tokens) as u32,
    };

    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(fallback_model)
        .to_string();

    GenerateContentResponse {
        candidates: vec![agentbridge_domain::canonical::Candidate {
            content: Content {
                role: Role::Model,
                parts,
            },
            finish_reason,
        }],
        usage_metadata: Some(usage),
        model,
    }
}

/// One `tool_calls[i]` wire entry → canonical [`Part::ToolCall`].
/// Unparseable `arguments` yields an empty args map and logs
/// (spec.md §4.3.4 / §7 `ToolArgumentsUnparseable`).
fn tool_call_part(tc: &Value) -> Part {
    let id = tc.get("id").and_then(Value::as_str).map(str::to_string);
    let name = tc
        .get("function")
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let args_str = tc
        .get("function")
        .and_then(|f| f.get("arguments"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let args = parse_tool_arguments(args_str, id.as_deref());
    Part::ToolCall(agentbridge_domain::canonical::ToolCall { id, name, args })
}

fn parse_tool_arguments(raw: &str, call_id: Option<&str>) -> Value {
    if raw.is_empty() {
        return Value::Object(Default::default());
    }
    match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(
                tool_call_id = call_id.unwrap_or("<none>"),
                error = %e,
                "tool-call arguments did not parse as JSON; emitting empty args"
            );
            Value::Object(Default::default())
        }
    }
}

/// `"choices[0].message.content"` → `"choices[0].message"`. Used to find
/// the sibling `tool_calls` array from the content path's parent object,
/// since the descriptor only names the content leaf (spec.md §9: walk the
/// generic JSON value, don't model named fields).
fn parent_path(path: &str) -> Option<&str> {
    path.rfind('.').map(|idx| &path[..idx])
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound — §4.4 (streaming)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct StreamPaths<'a> {
    delta_content: &'a str,
    delta_tool_calls: &'a str,
    finish_reason: &'a str,
}

fn stream_paths(descriptor: &AdapterDescriptor) -> StreamPaths<'_> {
    match &descriptor.response_mapping.streaming {
        Some(p) => StreamPaths {
            delta_content: p.delta_content.as_deref().unwrap_or("choices[0].delta.content"),
            delta_tool_calls: p
                .delta_tool_calls
                .as_deref()
                .unwrap_or("choices[0].delta.tool_calls"),
            finish_reason: p.finish_reason.as_deref().unwrap_or("choices[0].finish_reason"),
        },
        None => StreamPaths {
            delta_content: "choices[0].delta.content",
            delta_tool_calls: "choices[0].delta.tool_calls",
            finish_reason: "choices[0].finish_reason",
        },
    }
}

/// Fold one decoded SSE `data:` payload into the accumulator and,
/// per spec.md §4.4, emit a [`StreamChunk`] only when this chunk carries
/// a text delta (immediately) or a non-null `finish_reason` (the
/// terminal, consolidated emission). Returns `None` for chunks that carry
/// only in-progress tool-call fragments.
pub fn fold_stream_chunk(
    descriptor: &AdapterDescriptor,
    data: &Value,
    accumulator: &mut StreamAccumulator,
) -> Option<StreamChunk> {
    let paths = stream_paths(descriptor);

    let text_delta = resolve_json_path(data, paths.delta_content)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if let Some(deltas) = resolve_json_path(data, paths.delta_tool_calls).and_then(Value::as_array) {
        for delta in deltas {
            accumulator.ingest(tool_call_fragment(delta));
        }
    }

    let finish_reason_wire = resolve_json_path(data, paths.finish_reason).and_then(Value::as_str);

    match finish_reason_wire {
        Some(wire) => {
            let mut parts = Vec::new();
            if let Some(text) = text_delta {
                parts.push(Part::Text(text));
            }
            parts.extend(std::mem::take(accumulator).finalize());
            let usage = resolve_streaming_usage(descriptor, data);
            Some(StreamChunk {
                parts,
                finish_reason: Some(FinishReason::from_openai(wire)),
                usage_metadata: usage,
            })
        }
        None => text_delta.map(StreamChunk::text),
    }
}

fn resolve_streaming_usage(descriptor: &AdapterDescriptor, data: &Value) -> Option<UsageMetadata> {
    if data.get("usage").is_none() {
        return None;
    }
    Some(UsageMetadata {
        prompt_tokens: resolve_usage_expression(data, &descriptor.response_mapping.usage.prompt_tokens) as u32,
        completion_tokens: resolve_usage_expression(
            data,
            &descriptor.response_mapping.usage.completion_tokens,
        ) as u32,
        total_tokens: resolve_usage_expression(data, &descriptor.response_mapping.usage.total_tokens) as u32,
    })
}

fn tool_call_fragment(delta: &Value) -> ToolCallFragment {
    ToolCallFragment {
        index: delta.get("index").and_then(Value::as_u64).unwrap_or(0) as u32,
        id: delta.get("id").and_then(Value::as_str).map(str::to_string),
        name: delta
            .get("function")
            .and_then(|f| f.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        arguments_fragment: delta
            .get("function")
            .and_then(|f| f.get("arguments"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentbridge_domain::canonical::{
        Content, DeclarationThunk, GenerationConfig, Part, Role, ToolCall, ToolDeclaration,
        ToolResponse, ToolSource,
    };
    use agentbridge_domain::descriptor::*;
    use std::collections::HashMap;

    fn test_descriptor() -> AdapterDescriptor {
        let mut parameter_mapping = HashMap::new();
        parameter_mapping.insert("temperature".to_string(), "temperature".to_string());
        parameter_mapping.insert("topP".to_string(), "top_p".to_string());
        parameter_mapping.insert("maxOutputTokens".to_string(), "max_tokens".to_string());
        parameter_mapping.insert("stopSequences".to_string(), "stop".to_string());
        parameter_mapping.insert("presencePenalty".to_string(), "presence_penalty".to_string());
        parameter_mapping.insert("frequencyPenalty".to_string(), "frequency_penalty".to_string());

        AdapterDescriptor {
            adapter_type: "openai".into(),
            endpoints: HashMap::from([("chat".to_string(), "/chat/completions".to_string())]),
            parameter_mapping,
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
            error_handling: Default::default(),
            request_headers: Default::default(),
            default_models: Default::default(),
            json_mode_prompt_rewrite: true,
        }
    }

    // S1 — single-turn text.
    #[test]
    fn parses_single_turn_text_response() {
        let descriptor = test_descriptor();
        let body = json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 2, "completion_tokens": 1, "total_tokens": 3}
        });
        let resp = parse_response(&descriptor, &body, "m1");
        assert_eq!(resp.text(), "hello");
        assert_eq!(resp.candidates[0].finish_reason, Some(FinishReason::Stop));
        let usage = resp.usage_metadata.unwrap();
        assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (2, 1, 3));
    }

    // S2 — tool call, non-streaming.
    #[test]
    fn parses_non_streaming_tool_call() {
        let descriptor = test_descriptor();
        let body = json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{"id": "t1", "type": "function", "function": {"name": "readFile", "arguments": "{\"path\":\"/x\"}"}}]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let resp = parse_response(&descriptor, &body, "m1");
        let cand = &resp.candidates[0];
        assert_eq!(cand.finish_reason, Some(FinishReason::Stop));
        let calls: Vec<_> = cand.content.tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_deref(), Some("t1"));
        assert_eq!(calls[0].name, "readFile");
        assert_eq!(calls[0].args, json!({"path": "/x"}));
    }

    // S4 — tool response round-trip.
    #[test]
    fn tool_response_becomes_tool_message() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Role::User,
                parts: vec![Part::ToolResponse(ToolResponse {
                    id: "t1".into(),
                    response: json!({"ok": true}),
                })],
            }],
            ..Default::default()
        };
        let messages = outbound_messages(&request, &[]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "tool");
        assert_eq!(messages[0]["tool_call_id"], "t1");
        assert_eq!(messages[0]["content"], "{\"ok\":true}");
    }

    // S5 — schema coercion.
    #[test]
    fn coerces_stringly_typed_schema_constraints() {
        let schema = json!({"type": "INTEGER", "minimum": "5"});
        let coerced = coerce_schema(&schema);
        assert_eq!(coerced, json!({"type": "integer", "minimum": 5.0}));
    }

    // S6 — JSON response mode.
    #[test]
    fn json_mode_sets_response_format_and_rewrites_last_user_message() {
        let descriptor = test_descriptor();
        let request = GenerateContentRequest {
            contents: vec![Content::user_text("give me data")],
            config: GenerationConfig {
                response_mime_type: Some("application/json".into()),
                ..Default::default()
            },
            model: "m1".into(),
            ..Default::default()
        };
        let body = build_request_body(&descriptor, &request, false, &[]);
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
        let last_msg_content = body["messages"].as_array().unwrap().last().unwrap()["content"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(last_msg_content.contains("give me data"));
        assert!(last_msg_content.to_lowercase().contains("json"));
    }

    // S7-adjacent: assistant message with tool calls round-trips ids.
    #[test]
    fn assistant_tool_call_message_assigns_fallback_ids() {
        let content = Content {
            role: Role::Model,
            parts: vec![Part::ToolCall(ToolCall {
                id: None,
                name: "search".into(),
                args: json!({"q": "rust"}),
            })],
        };
        let msg = assistant_tool_call_message(&content);
        assert_eq!(msg["tool_calls"][0]["id"], "call_0");
        assert_eq!(msg["content"], Value::Null);
    }

    fn image_content() -> Content {
        Content {
            role: Role::User,
            parts: vec![
                Part::Text("what is this?".into()),
                Part::InlineData {
                    mime_type: "image/png".into(),
                    data: "YWJj".into(),
                },
            ],
        }
    }

    // §4.3.1 point 3 — image inlining requires both an image part and a
    // model that declares the `image` modality.
    #[test]
    fn plain_message_inlines_image_when_modality_supported() {
        let msg = plain_message(&image_content(), true);
        let parts = msg["content"].as_array().expect("multi-part content");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
    }

    #[test]
    fn plain_message_keeps_text_shape_when_modality_unsupported() {
        let msg = plain_message(&image_content(), false);
        assert_eq!(msg["content"], json!("what is this?"));
    }

    #[test]
    fn outbound_messages_gates_image_inlining_on_supported_modalities() {
        let request = GenerateContentRequest {
            contents: vec![image_content()],
            ..Default::default()
        };
        let text_only = outbound_messages(&request, &[]);
        assert_eq!(text_only[0]["content"], json!("what is this?"));

        let vision = outbound_messages(&request, &["text".to_string(), "image".to_string()]);
        assert!(vision[0]["content"].is_array());
    }

    #[test]
    fn callable_tool_resolves_thunk_once_per_request() {
        let thunk: DeclarationThunk = std::sync::Arc::new(|| ToolDeclaration {
            name: "dyn_tool".into(),
            description: "resolved lazily".into(),
            parameters: json!({"type": "object", "properties": {}}),
        });
        let config = GenerationConfig {
            tools: vec![ToolSource::Callable(thunk)],
            ..Default::default()
        };
        let tools = outbound_tools(&config);
        assert_eq!(tools[0]["function"]["name"], "dyn_tool");
    }

    #[test]
    fn usage_expression_with_missing_operand_resolves_to_present_value() {
        let mut descriptor = test_descriptor();
        descriptor.response_mapping.usage.total_tokens = "usage.input + usage.output".into();
        let body = json!({
            "choices": [{"message": {"content": "hi"}, "finish_reason": "stop"}],
            "usage": {"input": 10}
        });
        let resp = parse_response(&descriptor, &body, "m1");
        assert_eq!(resp.usage_metadata.unwrap().total_tokens, 10);
    }

    // S3 — streaming reassembly, via fold_stream_chunk + accumulator.
    #[test]
    fn streaming_tool_call_emits_once_at_terminal_chunk() {
        let descriptor = test_descriptor();
        let mut acc = StreamAccumulator::new();

        let c1 = json!({"choices": [{"delta": {"tool_calls": [{"index": 0, "id": "t1", "function": {"name": "runShell"}}]}}]});
        let c2 = json!({"choices": [{"delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{\"cmd\":"}}]}}]});
        let c3 = json!({"choices": [{"delta": {"tool_calls": [{"index": 0, "function": {"arguments": "\"ls\"}"}}]}}]});
        let terminal = json!({"choices": [{"delta": {}, "finish_reason": "tool_calls"}]});

        assert!(fold_stream_chunk(&descriptor, &c1, &mut acc).is_none());
        assert!(fold_stream_chunk(&descriptor, &c2, &mut acc).is_none());
        assert!(fold_stream_chunk(&descriptor, &c3, &mut acc).is_none());

        let chunk = fold_stream_chunk(&descriptor, &terminal, &mut acc).unwrap();
        assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
        assert_eq!(chunk.parts.len(), 1);
        match &chunk.parts[0] {
            Part::ToolCall(tc) => {
                assert_eq!(tc.id.as_deref(), Some("t1"));
                assert_eq!(tc.name, "runShell");
                assert_eq!(tc.args, json!({"cmd": "ls"}));
            }
            _ => panic!("expected tool call part"),
        }
    }

    #[test]
    fn streaming_text_delta_emits_immediately() {
        let descriptor = test_descriptor();
        let mut acc = StreamAccumulator::new();
        let chunk_data = json!({"choices": [{"delta": {"content": "hel"}}]});
        let chunk = fold_stream_chunk(&descriptor, &chunk_data, &mut acc).unwrap();
        assert_eq!(chunk.parts.len(), 1);
        assert!(chunk.finish_reason.is_none());
    }

    #[test]
    fn empty_tool_calls_with_finish_reason_emits_finish_only() {
        let descriptor = test_descriptor();
        let mut acc = StreamAccumulator::new();
        let terminal = json!({"choices": [{"delta": {}, "finish_reason": "stop"}]});
        let chunk = fold_stream_chunk(&descriptor, &terminal, &mut acc).unwrap();
        assert!(chunk.parts.is_empty());
        assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
    }
}
