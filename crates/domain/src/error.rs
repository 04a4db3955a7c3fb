//! Shared error taxonomy for the provider adapter core.
//!
//! Every variant corresponds to one row of the error taxonomy table in the
//! design docs; the adapter layer never recovers from these locally — they
//! are all surfaced to the caller, except for the two situations that are
//! deliberately logged-and-swallowed inline (unparseable streaming
//! envelopes, unparseable tool-call arguments — see `providers::translate`
//! and `providers::accumulator`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("adapter descriptor not found for adapter type '{0}'")]
    AdapterDescriptorNotFound(String),

    #[error("adapter descriptor for '{adapter_type}' is invalid: {reason}")]
    AdapterDescriptorInvalid {
        adapter_type: String,
        reason: String,
    },

    #[error("unknown adapter type '{0}'")]
    UnknownAdapterType(String),

    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("provider '{provider}' HTTP error {status}: {message}")]
    ProviderHttpError {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("provider '{provider}' authentication failed (HTTP {status}): {message}")]
    ProviderAuthError {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("provider '{provider}' rate limited (HTTP {status}): {message}")]
    ProviderRateLimited {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("provider '{provider}' timed out: {message}")]
    ProviderTimeout { provider: String, message: String },

    #[error("malformed response from provider '{provider}': {reason}")]
    MalformedResponse { provider: String, reason: String },

    #[error("operation unsupported by provider '{provider}': {operation}")]
    OperationUnsupported {
        provider: String,
        operation: String,
    },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
