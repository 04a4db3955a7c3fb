//! Shared, wire-agnostic types for the LLM provider adapter core:
//! the canonical content-generation vocabulary, the static adapter
//! descriptor shape, the mutable user-provider-record shape, the
//! streaming contract, and the shared error taxonomy.
//!
//! No HTTP, no filesystem access — see `agentbridge-providers` for the
//! runtime that reads descriptors off disk and talks to the network.

pub mod canonical;
pub mod descriptor;
pub mod error;
pub mod record;
pub mod stream;
