// error.rs — Error types for proposal parsing and schema validation.

use thiserror::Error;

/// The first structural constraint a proposal document violates.
///
/// Validation is all-or-nothing: a `SchemaError` means no part of the
/// document was accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document is not valid JSON at all.
    #[error("proposal is not valid JSON: {0}")]
    InvalidJson(String),

    /// The top-level value is not a JSON object.
    #[error("proposal must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    /// Serde rejected the shape (missing field, wrong type, unknown variant).
    #[error("invalid proposal shape: {0}")]
    Shape(String),

    /// The `protocol` tag is not the supported version.
    #[error("unsupported protocol '{found}' (expected '{expected}')")]
    Protocol {
        found: String,
        expected: &'static str,
    },

    /// A required string field is present but empty.
    #[error("field '{field}' must be a non-empty string")]
    EmptyField { field: String },

    /// Two provenance entries share an id.
    #[error("duplicate provenance id '{id}'")]
    DuplicateProvenance { id: String },
}

impl SchemaError {
    pub(crate) fn empty(field: impl Into<String>) -> Self {
        SchemaError::EmptyField {
            field: field.into(),
        }
    }
}
