//! The mutable, user-persisted side of the config model — spec.md §3
//! "User Provider Record" and the settings file shape from §6.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProviderRecord {
    pub id: String,
    pub name: String,
    pub adapter_type: String,
    pub base_url: String,
    /// Literal value, or `"$ENV_NAME"` referencing an environment
    /// variable. Resolution is deferred to request time — see
    /// `providers::config_resolver::resolve_api_key`.
    pub api_key: String,
    /// Ordered list of enabled model ids; the first is the default.
    pub models: Vec<String>,
    #[serde(default)]
    pub model_overrides: HashMap<String, ModelOverride>,
    #[serde(default)]
    pub provider_overrides: Option<ProviderOverrides>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl UserProviderRecord {
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}

/// A partial per-model override. Every field is independently optional so
/// a record can override just `contextWindow` without touching
/// `features`. `None` means "inherit the descriptor default".
///
/// spec.md §4.2's "a `null` override explicitly unsets the default" edge
/// case applies only to the generic, free-form `config_resolver::deep_merge`
/// path (arbitrary JSON overrides), not to this typed struct: with
/// `#[serde(default)]` on an `Option<T>` field, a JSON `null` and an
/// absent key both deserialize to `None`, so the two cases are
/// indistinguishable here by construction. Per-model resolution therefore
/// treats every `None` on this struct as "inherit" — there is no typed
/// representation of an explicit null-unset at this layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelOverride {
    #[serde(default)]
    pub context_window: Option<u32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    /// `None` = inherit. `Some(vec![])` = explicitly replace with an empty
    /// list (arrays replace, never concatenate — spec.md §4.2).
    #[serde(default)]
    pub supported_modalities: Option<Vec<String>>,
    #[serde(default)]
    pub features: Option<PartialFeatures>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialFeatures {
    #[serde(default)]
    pub streaming: Option<bool>,
    #[serde(default)]
    pub function_calling: Option<bool>,
    #[serde(default)]
    pub vision: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderOverrides {
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
}

/// Process-wide selection state, read at request-construction time
/// (spec.md §3 "Session Selection State").
#[derive(Debug, Clone, Default)]
pub struct SessionSelection {
    pub current_provider: Option<String>,
    pub current_model: Option<String>,
}

/// The subset of the persisted settings file this core reads (spec.md
/// §6). The UI owns the rest of the file and the write path entirely;
/// this core never writes it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsFile {
    #[serde(default)]
    pub selected_auth_type: Option<String>,
    #[serde(default)]
    pub current_provider: Option<String>,
    #[serde(default)]
    pub current_model: Option<String>,
    #[serde(default)]
    pub custom_providers: HashMap<String, UserProviderRecord>,
}

/// The string `selectedAuthType` must equal for this core to be selected
/// (spec.md §6).
pub const CUSTOM_PROVIDER_AUTH_TYPE: &str = "custom-provider";

impl SettingsFile {
    pub fn is_custom_provider_selected(&self) -> bool {
        self.selected_auth_type.as_deref() == Some(CUSTOM_PROVIDER_AUTH_TYPE)
    }

    /// Resolve the active provider record + model id, enforcing the
    /// invariant from spec.md §3: both must be set and resolvable.
    pub fn resolve_selection(&self) -> Result<(&UserProviderRecord, &str), String> {
        let provider_id = self
            .current_provider
            .as_deref()
            .ok_or_else(|| "currentProvider is not set".to_string())?;
        let record = self
            .custom_providers
            .get(provider_id)
            .ok_or_else(|| format!("no provider record found for id '{provider_id}'"))?;
        let model_id = self
            .current_model
            .as_deref()
            .ok_or_else(|| "currentModel is not set".to_string())?;
        if !record.models.iter().any(|m| m == model_id) {
            return Err(format!(
                "model '{model_id}' is not enabled for provider '{provider_id}'"
            ));
        }
        Ok((record, model_id))
    }
}
