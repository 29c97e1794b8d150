use std::fmt;

use crate::updates::UpdateKind;

/// Broad class of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Input is not a record or its discriminant is absent, mistyped or unknown.
    ShapeMismatch,
    /// A field is missing or fails a type or length check.
    ConstraintViolation,
    /// A structurally valid field fails a derived rule.
    InvariantViolation,
}

impl ErrorClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorClass::ShapeMismatch => "shape-mismatch",
            ErrorClass::ConstraintViolation => "constraint-violation",
            ErrorClass::InvariantViolation => "invariant-violation",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an input could not be matched to any variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeMismatch {
    #[error("expected an object, found {found}")]
    NotARecord { found: &'static str },

    #[error("missing \"type\" discriminant")]
    MissingDiscriminant,

    #[error("\"type\" discriminant must be a string, found {found}")]
    DiscriminantNotString { found: &'static str },

    #[error("no variant matched type {0:?}")]
    UnknownVariant(String),
}

/// The field-level rule a value failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    TooShort {
        min: usize,
        actual: usize,
    },
    TooLong {
        max: usize,
        actual: usize,
    },
    /// Only reported in strict mode.
    UnknownField,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Missing => f.write_str("required field is missing"),
            Rule::WrongType { expected, found } => write!(f, "expected {expected}, found {found}"),
            Rule::TooShort { min, actual } => {
                write!(f, "length {actual} is below the minimum of {min}")
            }
            Rule::TooLong { max, actual } => {
                write!(f, "length {actual} exceeds the maximum of {max}")
            }
            Rule::UnknownField => f.write_str("field is not declared by this variant"),
        }
    }
}

/// Derived rules checked after the base shape of a field passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// A usage breakdown has no `total` entry.
    MissingTotal,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invariant::MissingTotal => f.write_str("breakdown must contain a \"total\" entry"),
        }
    }
}

/// The first failure found while validating an untyped value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(#[from] ShapeMismatch),

    #[error("{variant}.{field}: {rule}")]
    ConstraintViolation {
        variant: UpdateKind,
        field: String,
        rule: Rule,
    },

    #[error("{variant}.{field}: {invariant}")]
    InvariantViolation {
        variant: UpdateKind,
        field: String,
        invariant: Invariant,
    },
}

impl ValidationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ValidationError::ShapeMismatch(_) => ErrorClass::ShapeMismatch,
            ValidationError::ConstraintViolation { .. } => ErrorClass::ConstraintViolation,
            ValidationError::InvariantViolation { .. } => ErrorClass::InvariantViolation,
        }
    }

    /// Dotted path of the failing field, if the discriminant was resolved.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::ShapeMismatch(_) => None,
            ValidationError::ConstraintViolation { field, .. }
            | ValidationError::InvariantViolation { field, .. } => Some(field),
        }
    }

    /// The variant being checked when the failure occurred.
    pub fn variant(&self) -> Option<UpdateKind> {
        match self {
            ValidationError::ShapeMismatch(_) => None,
            ValidationError::ConstraintViolation { variant, .. }
            | ValidationError::InvariantViolation { variant, .. } => Some(*variant),
        }
    }
}

/// Errors at the byte boundary of the registry.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The registry configuration is unusable.
    #[error("invalid registry config: {0}")]
    InvalidConfig(String),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The payload decoded but failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The exported JSON Schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
