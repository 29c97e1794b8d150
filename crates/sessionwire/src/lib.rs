//! Validated ephemeral session updates for realtime clients.
//!
//! sessionwire declares the transient status events a session-sharing backend
//! pushes to its clients (activity, usage, machine presence) and validates
//! untyped traffic against them at the boundary.
//!
//! # Crate Structure
//!
//! - [`schema`] — Update types, limits and the validating registry
//!
//! The `sessionwire` binary (behind the `cli` feature) validates payloads
//! from files or stdin and exports the JSON Schema.

/// Re-export schema types.
pub mod schema {
    pub use sessionwire_schema::*;
}

pub use sessionwire_schema::{
    EphemeralUpdate, RegistryConfig, SchemaError, SchemaRegistry, UpdateKind, ValidationError,
};
