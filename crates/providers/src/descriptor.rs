//! C1 — Adapter Descriptor Loader.
//!
//! Locates the descriptor for an `adapterType` by searching a fixed list
//! of filesystem locations, parses it as JSON, and validates the presence
//! of the required top-level keys. Descriptors are cached by
//! `adapterType` for the process lifetime (spec.md §4.1, §9 "global
//! descriptor cache").

use agentbridge_domain::descriptor::AdapterDescriptor;
use agentbridge_domain::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

fn cache() -> &'static Mutex<HashMap<String, Arc<AdapterDescriptor>>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Arc<AdapterDescriptor>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Loads, validates, and caches [`AdapterDescriptor`]s.
///
/// Holds the list of filesystem roots to search under
/// `adapters/<adapterType>/config.json` (spec.md §6): install-relative,
/// source-relative, and cwd-relative, in that order. Each root is tried in
/// turn; the first one that yields a readable file wins.
pub struct DescriptorLoader {
    search_roots: Vec<PathBuf>,
}

impl DescriptorLoader {
    /// Build a loader with the standard three-location search list.
    ///
    /// `install_dir` is normally the compiled binary's parent directory
    /// (`std::env::current_exe()`'s parent, resolved by the caller since
    /// that lookup can fail in unusual sandboxes); `source_dir` is
    /// `env!("CARGO_MANIFEST_DIR")` of the crate shipping the descriptors.
    /// Both are optional because either may be unavailable or inapplicable
    /// (e.g. in a test harness).
    pub fn new(install_dir: Option<PathBuf>, source_dir: Option<PathBuf>) -> Self {
        let mut search_roots = Vec::new();
        if let Some(dir) = install_dir {
            search_roots.push(dir);
        }
        if let Some(dir) = source_dir {
            search_roots.push(dir);
        }
        if let Ok(cwd) = std::env::current_dir() {
            search_roots.push(cwd);
        }
        Self { search_roots }
    }

    /// A loader that only searches the given explicit roots, in order.
    /// Useful for tests that want full control over the search path.
    pub fn with_roots(search_roots: Vec<PathBuf>) -> Self {
        Self { search_roots }
    }

    /// Load (or return the cached copy of) the descriptor for
    /// `adapter_type`.
    pub fn load(&self, adapter_type: &str) -> Result<Arc<AdapterDescriptor>> {
        if let Some(cached) = cache().lock().get(adapter_type) {
            return Ok(cached.clone());
        }

        let path = self.find_descriptor_file(adapter_type).ok_or_else(|| {
            Error::AdapterDescriptorNotFound(adapter_type.to_string())
        })?;

        let raw = std::fs::read_to_string(&path)?;
        let descriptor: AdapterDescriptor = serde_json::from_str(&raw).map_err(|e| {
            Error::AdapterDescriptorInvalid {
                adapter_type: adapter_type.to_string(),
                reason: e.to_string(),
            }
        })?;

        validate(&descriptor)?;

        let descriptor = Arc::new(descriptor);
        cache()
            .lock()
            .insert(adapter_type.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    fn find_descriptor_file(&self, adapter_type: &str) -> Option<PathBuf> {
        for root in &self.search_roots {
            let candidate = root.join("adapters").join(adapter_type).join("config.json");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

/// Check the required top-level keys spec.md §4.1 calls out. The rest of
/// the shape is enforced by `serde` deserialization already having
/// succeeded (a missing required struct field fails deserialization
/// before we get here); this second pass exists because several of these
/// keys live inside `HashMap`s serde can't make "required" on its own
/// (`endpoints.chat`, the model catalogue).
fn validate(descriptor: &AdapterDescriptor) -> Result<()> {
    let mut problems = Vec::new();

    if !descriptor.endpoints.contains_key("chat") {
        problems.push("endpoints.chat is required".to_string());
    }
    if descriptor.response_mapping.content.is_empty() {
        problems.push("responseMapping.content is required".to_string());
    }
    if descriptor.response_mapping.finish_reason.is_empty() {
        problems.push("responseMapping.finishReason is required".to_string());
    }
    if descriptor.response_mapping.usage.prompt_tokens.is_empty()
        || descriptor.response_mapping.usage.completion_tokens.is_empty()
        || descriptor.response_mapping.usage.total_tokens.is_empty()
    {
        problems.push("responseMapping.usage.* paths are required".to_string());
    }
    if descriptor.default_models.is_empty() {
        problems.push("defaultModels must declare at least one model".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::AdapterDescriptorInvalid {
            adapter_type: descriptor.adapter_type.clone(),
            reason: problems.join("; "),
        })
    }
}

/// Exposed for callers (e.g. the registry) that need to know where on
/// disk a descriptor would be looked for without actually loading it.
pub fn descriptor_relative_path(adapter_type: &str) -> PathBuf {
    Path::new("adapters").join(adapter_type).join("config.json")
}
