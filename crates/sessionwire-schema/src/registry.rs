use serde_json::Value;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError, ValidationError};
use crate::updates::{EphemeralUpdate, UpdateKind};
use crate::validator::validate_value;

/// Validator for the ephemeral update union.
///
/// Holds only its limits, so one registry can be shared by any number of
/// callers without synchronization.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    config: RegistryConfig,
}

/// Result of validating one line of newline-delimited JSON.
#[derive(Debug)]
pub struct LineOutcome {
    /// 1-based line number in the input.
    pub line: usize,
    pub result: Result<EphemeralUpdate>,
}

impl SchemaRegistry {
    /// Create a registry with default limits.
    pub fn new() -> Self {
        Self {
            config: RegistryConfig::default(),
        }
    }

    /// Create a registry with explicit limits.
    pub fn with_config(config: RegistryConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    /// Validate a decoded value against the update union.
    pub fn validate(&self, input: &Value) -> std::result::Result<EphemeralUpdate, ValidationError> {
        validate_value(input, &self.config)
    }

    /// Decode and validate a JSON payload.
    pub fn validate_payload(&self, payload: &[u8]) -> Result<EphemeralUpdate> {
        let max = self.config.max_payload_size;
        if payload.len() > max {
            tracing::debug!(size = payload.len(), max, "rejecting oversized payload");
            return Err(SchemaError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let value: Value = serde_json::from_slice(payload)?;
        match self.validate(&value) {
            Ok(update) => {
                tracing::trace!(kind = %update.kind(), "payload validated");
                Ok(update)
            }
            Err(err) => {
                tracing::debug!(class = %err.class(), error = %err, "payload failed validation");
                Err(err.into())
            }
        }
    }

    /// Validate newline-delimited JSON. Blank lines are skipped.
    pub fn validate_lines(&self, text: &str) -> Vec<LineOutcome> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| LineOutcome {
                line: idx + 1,
                result: self.validate_payload(line.as_bytes()),
            })
            .collect()
    }

    /// Serialize an outbound update, re-checking it against the same limits
    /// applied to inbound traffic.
    pub fn encode(&self, update: &EphemeralUpdate) -> Result<Vec<u8>> {
        let value = serde_json::to_value(update)?;
        self.validate(&value)?;

        let bytes = serde_json::to_vec(&value)?;
        let max = self.config.max_payload_size;
        if bytes.len() > max {
            return Err(SchemaError::PayloadTooLarge {
                size: bytes.len(),
                max,
            });
        }
        Ok(bytes)
    }

    /// Variants in the order the registry declares them.
    pub fn variants(&self) -> &'static [UpdateKind] {
        &UpdateKind::ALL
    }

    /// Check if a discriminant names a known variant.
    pub fn has_variant(&self, discriminant: &str) -> bool {
        UpdateKind::from_discriminant(discriminant).is_some()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::{ErrorClass, Invariant, Rule, ShapeMismatch};
    use crate::updates::{ActivityUpdate, UsageBreakdown, UsageUpdate, TOTAL_KEY};

    fn small_registry() -> SchemaRegistry {
        SchemaRegistry::with_config(RegistryConfig {
            id_max: 8,
            label_max: 6,
            ..RegistryConfig::default()
        })
        .unwrap()
    }

    fn usage(sid: &str, key: &str, tokens: Value, cost: Value) -> Value {
        json!({
            "type": "usage",
            "sid": sid,
            "key": key,
            "timestamp": 1,
            "tokens": tokens,
            "cost": cost
        })
    }

    fn minimal(kind: UpdateKind) -> Value {
        match kind {
            UpdateKind::Activity => json!({
                "type": "activity", "sid": "s", "active": true, "activeAt": 0, "thinking": false
            }),
            UpdateKind::Usage => usage("s", "k", json!({"total": 0}), json!({"total": 0})),
            UpdateKind::MachineActivity => json!({
                "type": "machine-activity", "machineId": "m", "active": false, "activeAt": 0
            }),
            UpdateKind::MachineStatus => json!({
                "type": "machine-status", "machineId": "m", "online": true, "timestamp": 0
            }),
        }
    }

    #[test]
    fn minimal_documents_validate_for_every_variant() {
        let registry = SchemaRegistry::new();
        for kind in UpdateKind::ALL {
            let update = registry.validate(&minimal(kind)).unwrap();
            assert_eq!(update.kind(), kind);
            let wire = serde_json::to_value(&update).unwrap();
            assert_eq!(wire["type"], kind.as_str());
        }
    }

    #[test]
    fn removing_any_declared_field_reports_it_missing() {
        let registry = SchemaRegistry::new();
        for kind in UpdateKind::ALL {
            for spec in kind.fields() {
                let mut doc = minimal(kind);
                doc.as_object_mut().unwrap().remove(spec.name);
                let err = registry.validate(&doc).unwrap_err();
                assert_eq!(
                    err,
                    ValidationError::ConstraintViolation {
                        variant: kind,
                        field: spec.name.to_string(),
                        rule: Rule::Missing,
                    },
                    "{kind}.{}",
                    spec.name
                );
            }
        }
    }

    #[test]
    fn activity_scenario_narrows_to_activity() {
        let registry = SchemaRegistry::new();
        let update = registry
            .validate(&json!({
                "type": "activity",
                "sid": "abc",
                "active": true,
                "activeAt": 1700000000,
                "thinking": false
            }))
            .unwrap();

        let activity = update.as_activity().expect("should narrow to activity");
        assert_eq!(
            activity,
            &ActivityUpdate {
                sid: "abc".to_string(),
                active: true,
                active_at: 1_700_000_000.0,
                thinking: false,
            }
        );
    }

    #[test]
    fn usage_scenario_validates() {
        let registry = SchemaRegistry::new();
        let update = registry
            .validate(&usage("s1", "k", json!({"total": 10}), json!({"total": 0.02})))
            .unwrap();

        let usage = update.as_usage().unwrap();
        assert_eq!(usage.tokens.total(), 10.0);
        assert_eq!(usage.cost.total(), 0.02);
    }

    #[test]
    fn empty_sid_is_a_constraint_violation() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate(&usage("", "k", json!({"total": 1}), json!({"total": 1})))
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::ConstraintViolation);
        assert_eq!(err.field(), Some("sid"));
        assert_eq!(err.variant(), Some(UpdateKind::Usage));
    }

    #[test]
    fn identifier_length_boundaries() {
        let registry = small_registry();
        let id_max = registry.config().id_max;

        for (kind, field) in [
            (UpdateKind::Activity, "sid"),
            (UpdateKind::Usage, "sid"),
            (UpdateKind::MachineActivity, "machineId"),
            (UpdateKind::MachineStatus, "machineId"),
        ] {
            let mut doc = minimal(kind);
            doc[field] = json!("a".repeat(id_max));
            assert!(registry.validate(&doc).is_ok(), "{kind} at limit");

            doc[field] = json!("a".repeat(id_max + 1));
            assert_eq!(
                registry.validate(&doc).unwrap_err(),
                ValidationError::ConstraintViolation {
                    variant: kind,
                    field: field.to_string(),
                    rule: Rule::TooLong {
                        max: id_max,
                        actual: id_max + 1
                    },
                }
            );

            doc[field] = json!("");
            assert_eq!(
                registry.validate(&doc).unwrap_err(),
                ValidationError::ConstraintViolation {
                    variant: kind,
                    field: field.to_string(),
                    rule: Rule::TooShort { min: 1, actual: 0 },
                }
            );
        }
    }

    #[test]
    fn usage_key_length_boundaries() {
        let registry = small_registry();
        let label_max = registry.config().label_max;
        let totals = json!({"total": 1});

        let at_limit = usage("s", &"k".repeat(label_max), totals.clone(), totals.clone());
        assert!(registry.validate(&at_limit).is_ok());

        let over = usage("s", &"k".repeat(label_max + 1), totals.clone(), totals.clone());
        let err = registry.validate(&over).unwrap_err();
        assert_eq!(err.field(), Some("key"));
        assert_eq!(err.class(), ErrorClass::ConstraintViolation);

        let empty = usage("s", "", totals.clone(), totals);
        assert_eq!(registry.validate(&empty).unwrap_err().field(), Some("key"));
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let registry = small_registry();
        // 8 chars, 16 bytes.
        let doc = json!({
            "type": "machine-status",
            "machineId": "éééééééé",
            "online": true,
            "timestamp": 1
        });
        assert!(registry.validate(&doc).is_ok());
    }

    #[test]
    fn breakdown_without_total_is_an_invariant_violation() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate(&usage(
                "s",
                "k",
                json!({"input": 5, "output": 3}),
                json!({"total": 1}),
            ))
            .unwrap_err();

        assert_eq!(
            err,
            ValidationError::InvariantViolation {
                variant: UpdateKind::Usage,
                field: "tokens".to_string(),
                invariant: Invariant::MissingTotal,
            }
        );
        assert_eq!(err.class(), ErrorClass::InvariantViolation);
    }

    #[test]
    fn extra_breakdown_entries_are_accepted() {
        let registry = SchemaRegistry::new();
        let update = registry
            .validate(&usage(
                "s",
                "k",
                json!({"total": 8, "input": 5}),
                json!({"total": 0.5, "cache_read": 0.1}),
            ))
            .unwrap();

        let usage = update.as_usage().unwrap();
        assert_eq!(usage.tokens.get("input"), Some(5.0));
        assert_eq!(usage.cost.get("cache_read"), Some(0.1));
    }

    #[test]
    fn base_map_failure_takes_precedence_over_missing_total() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate(&usage(
                "s",
                "k",
                json!({"input": "five"}),
                json!({"total": 1}),
            ))
            .unwrap_err();

        assert_eq!(
            err,
            ValidationError::ConstraintViolation {
                variant: UpdateKind::Usage,
                field: "tokens.input".to_string(),
                rule: Rule::WrongType {
                    expected: "number",
                    found: "string"
                },
            }
        );
    }

    #[test]
    fn breakdown_key_over_label_max_is_rejected() {
        let registry = small_registry();
        let long_key = "x".repeat(registry.config().label_max + 1);
        let mut cost = serde_json::Map::new();
        cost.insert("total".to_string(), json!(1));
        cost.insert(long_key, json!(2));

        let err = registry
            .validate(&usage("s", "k", json!({"total": 1}), Value::Object(cost)))
            .unwrap_err();

        assert_eq!(err.field(), Some("cost.xxxxxx"));
        assert!(matches!(
            err,
            ValidationError::ConstraintViolation {
                rule: Rule::TooLong { max: 6, actual: 7 },
                ..
            }
        ));
    }

    #[test]
    fn breakdown_must_be_an_object() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate(&usage("s", "k", json!([1, 2]), json!({"total": 1})))
            .unwrap_err();
        assert_eq!(err.field(), Some("tokens"));
    }

    #[test]
    fn non_record_inputs_are_shape_mismatches() {
        let registry = SchemaRegistry::new();
        for (input, found) in [
            (Value::Null, "null"),
            (json!([]), "array"),
            (json!("activity"), "string"),
            (json!(3), "number"),
            (json!(true), "boolean"),
        ] {
            assert_eq!(
                registry.validate(&input).unwrap_err(),
                ValidationError::ShapeMismatch(ShapeMismatch::NotARecord { found })
            );
        }
    }

    #[test]
    fn discriminant_problems_are_shape_mismatches() {
        let registry = SchemaRegistry::new();

        assert_eq!(
            registry.validate(&json!({"sid": "s"})).unwrap_err(),
            ValidationError::ShapeMismatch(ShapeMismatch::MissingDiscriminant)
        );
        assert_eq!(
            registry.validate(&json!({"type": 1})).unwrap_err(),
            ValidationError::ShapeMismatch(ShapeMismatch::DiscriminantNotString { found: "number" })
        );
    }

    #[test]
    fn unknown_discriminant_is_reported_before_field_errors() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate(&json!({"type": "unknown-type", "sid": "", "active": "no"}))
            .unwrap_err();

        assert_eq!(
            err,
            ValidationError::ShapeMismatch(ShapeMismatch::UnknownVariant(
                "unknown-type".to_string()
            ))
        );
        assert_eq!(err.class(), ErrorClass::ShapeMismatch);
    }

    #[test]
    fn undeclared_fields_are_ignored_unless_strict() {
        let mut doc = minimal(UpdateKind::Activity);
        doc["extra"] = json!(true);

        assert!(SchemaRegistry::new().validate(&doc).is_ok());

        let strict = SchemaRegistry::with_config(RegistryConfig {
            strict_mode: true,
            ..RegistryConfig::default()
        })
        .unwrap();
        assert_eq!(
            strict.validate(&doc).unwrap_err(),
            ValidationError::ConstraintViolation {
                variant: UpdateKind::Activity,
                field: "extra".to_string(),
                rule: Rule::UnknownField,
            }
        );
        assert!(strict.validate(&minimal(UpdateKind::Activity)).is_ok());
    }

    #[test]
    fn validation_is_deterministic_and_does_not_mutate_input() {
        let registry = SchemaRegistry::new();
        let doc = usage("s", "k", json!({"input": 1}), json!({"total": 1}));
        let before = doc.clone();

        let first = registry.validate(&doc).unwrap_err();
        let second = registry.validate(&doc).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(doc, before);
    }

    #[test]
    fn payload_is_decoded_then_validated() {
        let registry = SchemaRegistry::new();
        let update = registry
            .validate_payload(br#"{"type":"machine-status","machineId":"m1","online":false,"timestamp":2}"#)
            .unwrap();
        assert_eq!(update.machine_id(), Some("m1"));

        assert!(matches!(
            registry.validate_payload(b"not-json"),
            Err(SchemaError::InvalidJson(_))
        ));
        assert!(matches!(
            registry.validate_payload(br#"{"type":"nope"}"#),
            Err(SchemaError::Validation(ValidationError::ShapeMismatch(_)))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected_before_decoding() {
        let registry = SchemaRegistry::with_config(RegistryConfig {
            max_payload_size: 16,
            ..RegistryConfig::default()
        })
        .unwrap();

        let payload = vec![b'x'; 17];
        assert!(matches!(
            registry.validate_payload(&payload),
            Err(SchemaError::PayloadTooLarge { size: 17, max: 16 })
        ));
    }

    #[test]
    fn lines_report_one_based_numbers_and_skip_blanks() {
        let registry = SchemaRegistry::new();
        let text = concat!(
            r#"{"type":"machine-status","machineId":"m1","online":true,"timestamp":1}"#,
            "\n\n",
            r#"{"type":"activity","sid":""}"#,
            "\n"
        );

        let outcomes = registry.validate_lines(text);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].line, 1);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(outcomes[1].line, 3);
        assert!(matches!(
            outcomes[1].result,
            Err(SchemaError::Validation(_))
        ));
    }

    #[test]
    fn encode_output_revalidates_to_equal_value() {
        let registry = SchemaRegistry::new();
        let update = EphemeralUpdate::from(UsageUpdate {
            sid: "s1".to_string(),
            key: "claude".to_string(),
            timestamp: 1_700_000_000.0,
            tokens: UsageBreakdown::new(8.0).with_entry("input", 5.0),
            cost: UsageBreakdown::new(0.02),
        });

        let bytes = registry.encode(&update).unwrap();
        let back = registry.validate_payload(&bytes).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn encode_rejects_updates_outside_limits() {
        let registry = small_registry();
        let update = EphemeralUpdate::from(ActivityUpdate {
            sid: "far-too-long-session".to_string(),
            active: true,
            active_at: 0.0,
            thinking: true,
        });

        assert!(matches!(
            registry.encode(&update),
            Err(SchemaError::Validation(ValidationError::ConstraintViolation { .. }))
        ));
    }

    #[test]
    fn encode_rejects_non_finite_numbers() {
        let registry = SchemaRegistry::new();
        let update = EphemeralUpdate::from(ActivityUpdate {
            sid: "s".to_string(),
            active: true,
            active_at: f64::NAN,
            thinking: false,
        });

        assert!(registry.encode(&update).is_err());
    }

    #[test]
    fn variants_are_listed_in_declaration_order() {
        let registry = SchemaRegistry::new();
        let names: Vec<&str> = registry.variants().iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["activity", "usage", "machine-activity", "machine-status"]
        );
        assert!(registry.has_variant("usage"));
        assert!(!registry.has_variant("Usage"));
    }

    #[test]
    fn usage_scenario_validates_at_smallest_label_max() {
        let registry = SchemaRegistry::with_config(RegistryConfig {
            label_max: TOTAL_KEY.len(),
            ..RegistryConfig::default()
        })
        .unwrap();

        let update = registry
            .validate(&usage("s1", "k", json!({"total": 10}), json!({"total": 0.02})))
            .unwrap();
        assert_eq!(update.as_usage().unwrap().tokens.total(), 10.0);
    }

    #[test]
    fn label_max_shorter_than_total_key_is_rejected() {
        let result = SchemaRegistry::with_config(RegistryConfig {
            label_max: 4,
            ..RegistryConfig::default()
        });
        assert!(matches!(result, Err(SchemaError::InvalidConfig(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = SchemaRegistry::with_config(RegistryConfig {
            id_max: 0,
            ..RegistryConfig::default()
        });
        assert!(matches!(result, Err(SchemaError::InvalidConfig(_))));
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        let registry = std::sync::Arc::new(SchemaRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || {
                    let doc = json!({
                        "type": "machine-status",
                        "machineId": format!("m{i}"),
                        "online": i % 2 == 0,
                        "timestamp": i
                    });
                    registry.validate(&doc).is_ok()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
