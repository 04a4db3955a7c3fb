//! C2 — Layered Config Resolver.
//!
//! Merges an adapter descriptor's defaults with a user-supplied provider
//! record: env-var substitution, deep merge with user-wins semantics,
//! array replacement (spec.md §4.2).

use crate::util::resolve_api_key as resolve_api_key_raw;
use agentbridge_domain::canonical::{ModelFeatures, ResolvedModel};
use agentbridge_domain::descriptor::{AdapterDescriptor, DescriptorFeatures};
use agentbridge_domain::record::UserProviderRecord;
use std::collections::HashMap;

/// Resolve the API key for a provider record (spec.md §4.2). Thin
/// wrapper over `util::resolve_api_key` kept here so callers only need to
/// import `config_resolver` for every C2 operation.
pub fn resolve_api_key(record: &UserProviderRecord) -> String {
    resolve_api_key_raw(&record.api_key)
}

/// Resolve the effective model config for `model_id` under `record`,
/// given `descriptor`'s default catalogue.
///
/// Returns `None` if the model is in neither the descriptor's
/// `defaultModels` nor `record.models` (spec.md §4.2).
///
/// Note on null-unset: spec.md §4.2's "a `null` override explicitly
/// unsets the default" applies to the generic [`deep_merge`] used for
/// free-form JSON overrides. `record.model_overrides` is the typed
/// [`agentbridge_domain::record::ModelOverride`] shape, where an absent
/// field and a JSON `null` both deserialize to `None` — this resolver
/// always treats `None` as "inherit the default", never as an explicit
/// unset, because the typed override has no way to represent the
/// distinction (see the doc comment on `ModelOverride`).
pub fn resolve_model_config(
    descriptor: &AdapterDescriptor,
    record: &UserProviderRecord,
    model_id: &str,
) -> Option<ResolvedModel> {
    let default_entry = descriptor.default_models.get(model_id);
    if default_entry.is_none() && !record.models.iter().any(|m| m == model_id) {
        return None;
    }

    let override_entry = record.model_overrides.get(model_id);

    let (display_name, context_window, max_output_tokens, supported_modalities, features) =
        match default_entry {
            Some(default) => (
                default.display_name.clone(),
                merge_scalar(default.context_window, override_entry.and_then(|o| o.context_window)),
                merge_scalar(
                    default.max_output_tokens,
                    override_entry.and_then(|o| o.max_output_tokens),
                ),
                merge_array(
                    &default.supported_modalities,
                    override_entry.and_then(|o| o.supported_modalities.as_ref()),
                ),
                merge_features(&default.features, override_entry.and_then(|o| o.features.as_ref())),
            ),
            None => {
                // No descriptor default: the record itself enabled the
                // model with no catalogue entry. Fall back to whatever
                // the override supplies, defaulting the rest.
                let o = override_entry;
                (
                    model_id.to_string(),
                    o.and_then(|o| o.context_window).unwrap_or(0),
                    o.and_then(|o| o.max_output_tokens).unwrap_or(0),
                    o.and_then(|o| o.supported_modalities.clone()).unwrap_or_default(),
                    ModelFeatures {
                        streaming: o.and_then(|o| o.features.as_ref()).and_then(|f| f.streaming).unwrap_or(false),
                        function_calling: o
                            .and_then(|o| o.features.as_ref())
                            .and_then(|f| f.function_calling)
                            .unwrap_or(false),
                        vision: o.and_then(|o| o.features.as_ref()).and_then(|f| f.vision).unwrap_or(false),
                    },
                )
            }
        };

    Some(ResolvedModel {
        display_name,
        context_window,
        max_output_tokens,
        supported_modalities,
        features,
    })
}

/// Override wins when present; default wins on absence. `0` is a
/// legitimate explicit override, distinguished from "unset" by the
/// `Option` itself (spec.md §4.2 edge-case policy). Null-unset does not
/// apply at this typed layer — see the note on
/// [`resolve_model_config`]/`ModelOverride`.
fn merge_scalar(default: u32, override_value: Option<u32>) -> u32 {
    override_value.unwrap_or(default)
}

/// Arrays replace, never concatenate (spec.md §4.2 / §8 property 2).
fn merge_array(default: &[String], override_value: Option<&Vec<String>>) -> Vec<String> {
    match override_value {
        Some(v) => v.clone(),
        None => default.to_vec(),
    }
}

fn merge_features(
    default: &DescriptorFeatures,
    override_value: Option<&agentbridge_domain::record::PartialFeatures>,
) -> ModelFeatures {
    ModelFeatures {
        streaming: override_value
            .and_then(|f| f.streaming)
            .unwrap_or(default.streaming),
        function_calling: override_value
            .and_then(|f| f.function_calling)
            .unwrap_or(default.function_calling),
        vision: override_value.and_then(|f| f.vision).unwrap_or(default.vision),
    }
}

/// Resolve a provider-level setting (`timeout`, `maxRetries`): consult
/// `providerOverrides`, fall back to the supplied default. There is no
/// record-level top-level field for these in the record shape (they only
/// ever live under `providerOverrides`), so the "top-level record fields"
/// tier spec.md §4.2 mentions collapses into this one lookup.
pub fn resolve_timeout_ms(record: &UserProviderRecord, default_ms: u64) -> u64 {
    record
        .provider_overrides
        .as_ref()
        .and_then(|o| o.timeout)
        .unwrap_or(default_ms)
}

pub fn resolve_max_retries(record: &UserProviderRecord, default_retries: u32) -> u32 {
    record
        .provider_overrides
        .as_ref()
        .and_then(|o| o.max_retries)
        .unwrap_or(default_retries)
}

/// Resolve outbound HTTP headers: `Content-Type` first, then the
/// descriptor's required headers with `{apiKey}` substituted, then any
/// user-supplied custom headers overlaid last (spec.md §4.2).
pub fn resolve_headers(
    descriptor: &AdapterDescriptor,
    record: &UserProviderRecord,
) -> HashMap<String, String> {
    let api_key = resolve_api_key(record);
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    for (name, template) in &descriptor.request_headers.required {
        headers.insert(name.clone(), template.replace("{apiKey}", &api_key));
    }
    for (name, template) in &descriptor.request_headers.optional {
        headers.insert(name.clone(), template.replace("{apiKey}", &api_key));
    }

    if let Some(overrides) = &record.provider_overrides {
        for (name, value) in &overrides.custom_headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    headers
}

/// Deep-merge two JSON-ish maps with override-wins semantics: nested maps
/// merge recursively, arrays replace, a `null` in the override explicitly
/// unsets the key, primitives replace, missing keys are taken from the
/// other side (spec.md §4.2 / §8 property 2). Exposed for descriptor
/// fields that arrive as raw JSON (e.g. future free-form overrides) rather
/// than the strongly-typed `ModelOverride` shape.
pub fn deep_merge(default: &serde_json::Value, override_value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match (default, override_value) {
        (Value::Object(default_map), Value::Object(override_map)) => {
            let mut merged = default_map.clone();
            for (key, override_val) in override_map {
                if override_val.is_null() {
                    merged.remove(key);
                    continue;
                }
                match merged.get(key) {
                    Some(default_val) => {
                        merged.insert(key.clone(), deep_merge(default_val, override_val));
                    }
                    None => {
                        merged.insert(key.clone(), override_val.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        (_, override_value) => override_value.clone(),
    }
}
