//! JSON Schema 2020-12 rendering of the update union.
//!
//! The documents produced here accept exactly what
//! [`SchemaRegistry::validate`](crate::SchemaRegistry::validate) accepts, so
//! clients in other languages can enforce the same contract. Error precedence
//! is not part of that contract.

use jsonschema::Validator;
use serde_json::{json, Map, Value};

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::updates::{FieldKind, UpdateKind, TOTAL_KEY};

pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// Schema for a single variant, including its `type` literal.
pub fn variant_schema(kind: UpdateKind, config: &RegistryConfig) -> Value {
    let mut properties = Map::new();
    properties.insert("type".to_string(), json!({ "const": kind.as_str() }));

    let mut required = vec![Value::String("type".to_string())];
    for spec in kind.fields() {
        properties.insert(spec.name.to_string(), field_schema(spec.kind, config));
        required.push(Value::String(spec.name.to_string()));
    }

    let mut schema = Map::new();
    schema.insert("title".to_string(), Value::String(kind.as_str().to_string()));
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));
    schema.insert("required".to_string(), Value::Array(required));
    if config.strict_mode {
        schema.insert("additionalProperties".to_string(), Value::Bool(false));
    }
    Value::Object(schema)
}

/// Schema for the whole union, one `oneOf` branch per variant in declaration order.
pub fn union_schema(config: &RegistryConfig) -> Value {
    let branches: Vec<Value> = UpdateKind::ALL
        .iter()
        .map(|kind| variant_schema(*kind, config))
        .collect();

    json!({
        "$schema": DRAFT_2020_12,
        "title": "EphemeralUpdate",
        "type": "object",
        "required": ["type"],
        "oneOf": branches,
    })
}

/// Compile the union schema.
pub fn compile(config: &RegistryConfig) -> Result<Validator> {
    jsonschema::validator_for(&union_schema(config))
        .map_err(|err| SchemaError::CompileFailed(err.to_string()))
}

fn field_schema(kind: FieldKind, config: &RegistryConfig) -> Value {
    match kind {
        FieldKind::Id => json!({
            "type": "string",
            "minLength": 1,
            "maxLength": config.id_max,
        }),
        FieldKind::Label => json!({
            "type": "string",
            "minLength": 1,
            "maxLength": config.label_max,
        }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Breakdown => json!({
            "type": "object",
            "propertyNames": { "maxLength": config.label_max },
            "additionalProperties": { "type": "number" },
            "required": [TOTAL_KEY],
        }),
    }
}
