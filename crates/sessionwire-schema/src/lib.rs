//! Typed ephemeral session updates with runtime validation at the transport boundary.
//!
//! Realtime channels deliver small status events (session activity, token usage,
//! machine presence). This crate declares their shapes, validates decoded JSON
//! values against them and hands back a typed [`EphemeralUpdate`].
//!
//! Validation is pure: a [`SchemaRegistry`] holds only its limits and can be
//! shared freely between threads.

pub mod config;
pub mod error;
pub mod json_schema;
pub mod registry;
pub mod updates;
pub mod validator;

pub use config::{RegistryConfig, DEFAULT_MAX_PAYLOAD, ID_MAX, LABEL_MAX};
pub use error::{
    ErrorClass, Invariant, Result, Rule, SchemaError, ShapeMismatch, ValidationError,
};
pub use registry::{LineOutcome, SchemaRegistry};
pub use updates::{
    ActivityUpdate, EphemeralUpdate, FieldKind, FieldSpec, MachineActivityUpdate,
    MachineStatusUpdate, UpdateKind, UsageBreakdown, UsageUpdate, TOTAL_KEY,
};
