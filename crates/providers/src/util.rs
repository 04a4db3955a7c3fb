//! Small shared helpers used across the provider adapters: HTTP error
//! classification, deferred env-var API key resolution, dynamic JSON path
//! access, and secret masking for diagnostics.

use agentbridge_domain::error::Error;
use serde_json::Value;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Classifies by substring match as a fallback to `reqwest`'s own
/// `is_timeout()`, per spec.md §4.5's classifier rules.
pub(crate) fn classify_reqwest_error(provider: &str, e: reqwest::Error) -> Error {
    if is_timeout_error(&e) {
        Error::ProviderTimeout {
            provider: provider.to_string(),
            message: timeout_remediation(&e.to_string()),
        }
    } else {
        Error::Http(e.to_string())
    }
}

fn is_timeout_error(e: &reqwest::Error) -> bool {
    if e.is_timeout() {
        return true;
    }
    let msg = e.to_string().to_lowercase();
    const NEEDLES: &[&str] = &[
        "timeout",
        "timed out",
        "deadline exceeded",
        "etimedout",
        "esockettimedout",
    ];
    NEEDLES.iter().any(|n| msg.contains(n))
}

/// Wrap a raw timeout message with the remediation text spec.md §4.5
/// requires: reduce input size, raise `timeout`, check network, switch
/// streaming mode.
fn timeout_remediation(raw: &str) -> String {
    format!(
        "{raw}\n\
         Try one or more of the following:\n\
         - reduce the size of the request\n\
         - raise the configured 'timeout' for this provider\n\
         - check your network connection\n\
         - try toggling streaming mode"
    )
}

/// Resolve a provider record's `apiKey` field.
///
/// Literal values pass through unchanged. A value beginning with `$` is
/// treated as an environment variable name; if unset, a warning is logged
/// and the empty string is returned (spec.md §4.2 — the transport then
/// fails downstream with a clear auth error rather than failing here).
///
/// Deliberately not cached: called fresh on every request so a rotated
/// env var takes effect on the next call (spec.md §9).
pub fn resolve_api_key(raw: &str) -> String {
    match raw.strip_prefix('$') {
        Some(var_name) => match std::env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                tracing::warn!(
                    env_var = %var_name,
                    "apiKey references an unset environment variable; \
                     continuing with an empty key, request will fail auth"
                );
                String::new()
            }
        },
        None => raw.to_string(),
    }
}

/// Resolve a dotted/bracketed JSON path against a value, e.g.
/// `choices[0].message.content` or `usage.prompt_tokens`.
///
/// Returns `None` if any segment is missing or the wrong shape. Per
/// spec.md §9, this walks the generic `Value` at translation time rather
/// than deriving named struct fields — the whole point is schema
/// polymorphism across wire formats.
pub fn resolve_json_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_path(path) {
        match segment {
            PathSegment::Key(key) => {
                current = current.get(key)?;
            }
            PathSegment::Index(idx) => {
                current = current.get(idx)?;
            }
        }
    }
    Some(current)
}

enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Split `choices[0].message.content` into `[Key("choices"), Index(0),
/// Key("message"), Key("content")]`.
fn split_path(path: &str) -> Vec<PathSegment<'_>> {
    let mut segments = Vec::new();
    for dotted in path.split('.') {
        let mut rest = dotted;
        loop {
            if let Some(bracket_start) = rest.find('[') {
                let (before, after) = rest.split_at(bracket_start);
                if !before.is_empty() {
                    segments.push(PathSegment::Key(before));
                }
                let after = &after[1..];
                let bracket_end = match after.find(']') {
                    Some(i) => i,
                    None => break,
                };
                let idx_str = &after[..bracket_end];
                if let Ok(idx) = idx_str.parse::<usize>() {
                    segments.push(PathSegment::Index(idx));
                }
                rest = &after[bracket_end + 1..];
            } else {
                if !rest.is_empty() {
                    segments.push(PathSegment::Key(rest));
                }
                break;
            }
        }
    }
    segments
}

/// Resolve a usage-triple path expression. Per spec.md §4.3.4, an
/// expression containing `+` is split on `+`, each operand resolved as a
/// JSON path against the response, missing operands count as `0`, results
/// summed.
pub fn resolve_usage_expression(root: &Value, expr: &str) -> u64 {
    expr.split('+')
        .map(|operand| {
            resolve_json_path(root, operand.trim())
                .and_then(Value::as_u64)
                .unwrap_or(0)
        })
        .sum()
}

/// Mask substrings that look like API keys or bearer tokens in an error
/// message before it's logged or surfaced on a diagnostic surface.
pub fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let masked = if trimmed.len() > 8 {
                format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..])
            } else {
                "***masked***".to_string()
            };
            result = result.replace(trimmed, &masked);
        }
    }
    result
}
