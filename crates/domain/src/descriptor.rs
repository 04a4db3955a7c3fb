//! The static adapter descriptor — spec.md §3 "Adapter Descriptor".
//!
//! Shipped with the program as a JSON file per adapter type
//! (`adapters/<adapterType>/config.json`), loaded once by
//! `providers::descriptor` and cached for the process lifetime. This
//! module only defines the shape; loading/validation/caching lives in the
//! `providers` crate so this crate stays free of filesystem I/O.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterDescriptor {
    pub adapter_type: String,
    pub endpoints: HashMap<String, String>,
    #[serde(default)]
    pub parameter_mapping: HashMap<String, String>,
    pub response_mapping: ResponseMapping,
    pub token_counting: TokenCounting,
    #[serde(default)]
    pub error_handling: ErrorHandling,
    #[serde(default)]
    pub request_headers: RequestHeaders,
    #[serde(default)]
    pub default_models: HashMap<String, DefaultModelEntry>,
    /// When true, outbound JSON-mode requests set `response_format` AND
    /// rewrite the last user message (spec.md §9, "JSON-mode prompt
    /// rewriting hack"). Wire formats with native structured output can
    /// set this to `false` to skip the message rewrite.
    #[serde(default = "default_true")]
    pub json_mode_prompt_rewrite: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapping {
    pub content: String,
    pub finish_reason: String,
    pub usage: UsagePaths,
    #[serde(default)]
    pub streaming: Option<StreamingPaths>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePaths {
    pub prompt_tokens: String,
    pub completion_tokens: String,
    pub total_tokens: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingPaths {
    #[serde(default)]
    pub delta_content: Option<String>,
    #[serde(default)]
    pub delta_tool_calls: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCountingMethod {
    ResponseUsage,
    Estimation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCounting {
    pub method: TokenCountingMethod,
    #[serde(default)]
    pub fallback_estimation: FallbackEstimation,
}

/// Reserved weights for a more elaborate token estimate. spec.md §4.5
/// mandates only the 4-chars-per-token fallback; these are carried
/// through so a future heuristic can use them without a descriptor
/// format change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackEstimation {
    #[serde(default = "default_base_ratio")]
    pub base_ratio: f64,
    #[serde(default)]
    pub chinese_weight: f64,
    #[serde(default)]
    pub code_weight: f64,
    #[serde(default)]
    pub special_char_weight: f64,
}

impl Default for FallbackEstimation {
    fn default() -> Self {
        Self {
            base_ratio: default_base_ratio(),
            chinese_weight: 0.0,
            code_weight: 0.0,
            special_char_weight: 0.0,
        }
    }
}

fn default_base_ratio() -> f64 {
    4.0
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandling {
    #[serde(default)]
    pub auth_error_status: Vec<u16>,
    #[serde(default)]
    pub rate_limit_status: Vec<u16>,
    #[serde(default)]
    pub quota_error_status: Vec<u16>,
    #[serde(default)]
    pub error_message_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestHeaders {
    #[serde(default)]
    pub required: HashMap<String, String>,
    #[serde(default)]
    pub optional: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultModelEntry {
    pub display_name: String,
    pub context_window: u32,
    pub max_output_tokens: u32,
    #[serde(default)]
    pub supported_modalities: Vec<String>,
    #[serde(default)]
    pub features: DescriptorFeatures,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DescriptorFeatures {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub function_calling: bool,
    #[serde(default)]
    pub vision: bool,
}
