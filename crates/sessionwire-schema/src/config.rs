use crate::error::{Result, SchemaError};
use crate::updates::TOTAL_KEY;

/// Default maximum length of session and machine identifiers.
pub const ID_MAX: usize = 256;

/// Default maximum length of usage keys and breakdown entry names.
pub const LABEL_MAX: usize = 128;

/// Default maximum payload size accepted by the byte-level helpers: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Controls validation limits and behavior.
///
/// String lengths are measured in Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum length of `sid` and `machineId`.
    pub id_max: usize,
    /// Maximum length of `key` and of every `tokens`/`cost` entry name.
    pub label_max: usize,
    /// When true, fields not declared by the variant are rejected.
    pub strict_mode: bool,
    /// Maximum bytes accepted by [`SchemaRegistry::validate_payload`](crate::SchemaRegistry::validate_payload).
    pub max_payload_size: usize,
}

impl RegistryConfig {
    /// Check that every limit is usable.
    pub fn validated(self) -> Result<Self> {
        if self.id_max == 0 {
            return Err(SchemaError::InvalidConfig(
                "id_max must be greater than zero".to_string(),
            ));
        }
        // Breakdown keys are bounded by label_max and must be able to hold "total".
        let min_label = TOTAL_KEY.chars().count();
        if self.label_max < min_label {
            return Err(SchemaError::InvalidConfig(format!(
                "label_max must be at least {min_label} (length of \"{TOTAL_KEY}\"), got {}",
                self.label_max
            )));
        }
        if self.max_payload_size == 0 {
            return Err(SchemaError::InvalidConfig(
                "max_payload_size must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_max: ID_MAX,
            label_max: LABEL_MAX,
            strict_mode: false,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
