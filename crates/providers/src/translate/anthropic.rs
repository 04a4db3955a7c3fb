//! Anthropic Messages-API translation — structural stub (spec.md §9 Open
//! Questions: the source's Anthropic adapter is itself a stub, so this
//! covers only the text-only, non-streaming round trip needed to prove the
//! descriptor-driven shape generalizes past the OpenAI family). Tool
//! calling, streaming and embeddings are intentionally not implemented
//! here — see `anthropic::AnthropicAdapter` for how each operation fails.

use agentbridge_domain::canonical::{
    Candidate, Content, FinishReason, GenerateContentRequest, GenerateContentResponse, Role,
    UsageMetadata,
};
use serde_json::{json, Value};

/// Build a Messages-API body: system prompt lifted to the top-level
/// `system` field (Anthropic's wire format, unlike OpenAI, never inlines
/// it as a `{role:"system"}` message), remaining turns passed through as
/// `user`/`assistant` text-only messages.
pub fn build_request_body(request: &GenerateContentRequest, max_tokens: u32) -> Value {
    let messages: Vec<Value> = request
        .contents
        .iter()
        .map(|content| {
            let role = match content.role {
                Role::User => "user",
                Role::Model => "assistant",
            };
            json!({"role": role, "content": content.joined_text()})
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "max_tokens": max_tokens,
    });
    if let Some(system) = &request.system_instruction {
        body["system"] = json!(system);
    }
    if let Some(t) = request.config.temperature {
        body["temperature"] = json!(t);
    }
    body
}

/// Parse a Messages-API response. Only the first `text`-type content
/// block is surfaced; tool-use blocks are not translated (structural stub).
pub fn parse_response(body: &Value, fallback_model: &str) -> GenerateContentResponse {
    let text = body
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.iter().find(|b| b.get("type").and_then(Value::as_str) == Some("text")))
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let finish_reason = body
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(|wire| match wire {
            "end_turn" | "stop_sequence" | "tool_use" => FinishReason::Stop,
            "max_tokens" => FinishReason::MaxTokens,
            _ => FinishReason::Other,
        });

    let usage = body.get("usage").map(|u| {
        let input = u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
        let output = u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
        UsageMetadata {
            prompt_tokens: input,
            completion_tokens: output,
            total_tokens: input + output,
        }
    });

    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(fallback_model)
        .to_string();

    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Content::model_text(text),
            finish_reason,
        }],
        usage_metadata: usage,
        model,
    }
}
