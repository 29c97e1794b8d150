use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::RegistryConfig;
use crate::error::{Invariant, Rule, ShapeMismatch, ValidationError};
use crate::updates::{
    ActivityUpdate, EphemeralUpdate, FieldKind, MachineActivityUpdate, MachineStatusUpdate,
    UpdateKind, UsageBreakdown, UsageUpdate, TOTAL_KEY,
};

const DISCRIMINANT: &str = "type";

type Checked<T> = std::result::Result<T, ValidationError>;

/// Validate an untyped value against the update union.
///
/// The discriminant is resolved before any field check runs, so an unknown
/// `type` is always reported ahead of field errors.
pub(crate) fn validate_value(input: &Value, config: &RegistryConfig) -> Checked<EphemeralUpdate> {
    let object = match input {
        Value::Object(object) => object,
        other => {
            return Err(ShapeMismatch::NotARecord {
                found: json_type_name(other),
            }
            .into())
        }
    };

    let kind = match object.get(DISCRIMINANT) {
        None => return Err(ShapeMismatch::MissingDiscriminant.into()),
        Some(Value::String(tag)) => UpdateKind::from_discriminant(tag)
            .ok_or_else(|| ShapeMismatch::UnknownVariant(tag.clone()))?,
        Some(other) => {
            return Err(ShapeMismatch::DiscriminantNotString {
                found: json_type_name(other),
            }
            .into())
        }
    };

    let fields = Fields {
        kind,
        object,
        config,
    };
    let update = match kind {
        UpdateKind::Activity => check_activity(&fields)?,
        UpdateKind::Usage => check_usage(&fields)?,
        UpdateKind::MachineActivity => check_machine_activity(&fields)?,
        UpdateKind::MachineStatus => check_machine_status(&fields)?,
    };

    if config.strict_mode {
        fields.reject_undeclared()?;
    }

    Ok(update)
}

fn check_activity(fields: &Fields<'_>) -> Checked<EphemeralUpdate> {
    Ok(EphemeralUpdate::Activity(ActivityUpdate {
        sid: fields.id("sid")?,
        active: fields.boolean("active")?,
        active_at: fields.number("activeAt")?,
        thinking: fields.boolean("thinking")?,
    }))
}

fn check_usage(fields: &Fields<'_>) -> Checked<EphemeralUpdate> {
    Ok(EphemeralUpdate::Usage(UsageUpdate {
        sid: fields.id("sid")?,
        key: fields.label("key")?,
        timestamp: fields.number("timestamp")?,
        tokens: fields.breakdown("tokens")?,
        cost: fields.breakdown("cost")?,
    }))
}

fn check_machine_activity(fields: &Fields<'_>) -> Checked<EphemeralUpdate> {
    Ok(EphemeralUpdate::MachineActivity(MachineActivityUpdate {
        machine_id: fields.id("machineId")?,
        active: fields.boolean("active")?,
        active_at: fields.number("activeAt")?,
    }))
}

fn check_machine_status(fields: &Fields<'_>) -> Checked<EphemeralUpdate> {
    Ok(EphemeralUpdate::MachineStatus(MachineStatusUpdate {
        machine_id: fields.id("machineId")?,
        online: fields.boolean("online")?,
        timestamp: fields.number("timestamp")?,
    }))
}

/// Field accessors for one resolved variant.
struct Fields<'a> {
    kind: UpdateKind,
    object: &'a Map<String, Value>,
    config: &'a RegistryConfig,
}

impl Fields<'_> {
    fn id(&self, name: &str) -> Checked<String> {
        self.bounded_string(name, self.config.id_max)
    }

    fn label(&self, name: &str) -> Checked<String> {
        self.bounded_string(name, self.config.label_max)
    }

    fn bounded_string(&self, name: &str, max: usize) -> Checked<String> {
        let text = match self.require(name)? {
            Value::String(text) => text,
            other => return Err(self.wrong_type(name, "string", other)),
        };
        let actual = char_len(text);
        if actual == 0 {
            return Err(self.violation(name, Rule::TooShort { min: 1, actual }));
        }
        if actual > max {
            return Err(self.violation(name, Rule::TooLong { max, actual }));
        }
        Ok(text.clone())
    }

    fn boolean(&self, name: &str) -> Checked<bool> {
        match self.require(name)? {
            Value::Bool(flag) => Ok(*flag),
            other => Err(self.wrong_type(name, "boolean", other)),
        }
    }

    fn number(&self, name: &str) -> Checked<f64> {
        let value = self.require(name)?;
        as_number(value).ok_or_else(|| self.wrong_type(name, "number", value))
    }

    /// Base map checks run over every entry before the `total` refinement.
    fn breakdown(&self, name: &str) -> Checked<UsageBreakdown> {
        let map = match self.require(name)? {
            Value::Object(map) => map,
            other => return Err(self.wrong_type(name, "object", other)),
        };

        let label_max = self.config.label_max;
        let mut entries = BTreeMap::new();
        for (key, value) in map {
            let actual = char_len(key);
            if actual > label_max {
                let path = format!("{name}.{}", truncate_chars(key, label_max));
                return Err(self.violation(
                    &path,
                    Rule::TooLong {
                        max: label_max,
                        actual,
                    },
                ));
            }
            let number = as_number(value)
                .ok_or_else(|| self.wrong_type(&format!("{name}.{key}"), "number", value))?;
            entries.insert(key.clone(), number);
        }

        if !entries.contains_key(TOTAL_KEY) {
            return Err(ValidationError::InvariantViolation {
                variant: self.kind,
                field: name.to_string(),
                invariant: Invariant::MissingTotal,
            });
        }

        Ok(UsageBreakdown::from_checked(entries))
    }

    fn reject_undeclared(&self) -> Checked<()> {
        let declared = self.kind.fields();
        let undeclared = self.object.keys().find(|key| {
            key.as_str() != DISCRIMINANT && !declared.iter().any(|spec| spec.name == key.as_str())
        });
        match undeclared {
            Some(key) => Err(self.violation(key, Rule::UnknownField)),
            None => Ok(()),
        }
    }

    fn require(&self, name: &str) -> Checked<&Value> {
        self.object
            .get(name)
            .ok_or_else(|| self.violation(name, Rule::Missing))
    }

    fn wrong_type(&self, field: &str, expected: &'static str, found: &Value) -> ValidationError {
        self.violation(
            field,
            Rule::WrongType {
                expected,
                found: json_type_name(found),
            },
        )
    }

    fn violation(&self, field: &str, rule: Rule) -> ValidationError {
        ValidationError::ConstraintViolation {
            variant: self.kind,
            field: field.to_string(),
            rule,
        }
    }
}

/// Name of the constraint each declared field kind enforces, for diagnostics.
pub fn describe_field(kind: FieldKind, config: &RegistryConfig) -> String {
    match kind {
        FieldKind::Id => format!("string, 1..={} chars", config.id_max),
        FieldKind::Label => format!("string, 1..={} chars", config.label_max),
        FieldKind::Boolean => "boolean".to_string(),
        FieldKind::Number => "number".to_string(),
        FieldKind::Breakdown => format!(
            "map<string(<={}), number> with \"{TOTAL_KEY}\"",
            config.label_max
        ),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

/// Lengths are counted in Unicode scalar values.
fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
