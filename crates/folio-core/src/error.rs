//! Error types for document decoding.

use crate::model::Section;
use thiserror::Error;

/// A problem found while decoding a raw snapshot.
///
/// Decode errors never escape reconciliation: the affected section or field
/// falls back to its default and the error is reported for logging.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Snapshot is not an object (found {0})")]
    NotAnObject(&'static str),

    #[error("Section {section} is malformed: {reason}")]
    MalformedSection { section: Section, reason: String },

    #[error("Detail field {field} is malformed: {reason}")]
    MalformedField { field: &'static str, reason: String },

    #[error("Social link {index} is malformed: {reason}")]
    MalformedSocial { index: usize, reason: String },
}

impl DecodeError {
    pub(crate) fn section(section: Section, err: serde_json::Error) -> Self {
        DecodeError::MalformedSection {
            section,
            reason: err.to_string(),
        }
    }

    pub(crate) fn field(field: &'static str, err: serde_json::Error) -> Self {
        DecodeError::MalformedField {
            field,
            reason: err.to_string(),
        }
    }

    pub(crate) fn social(index: usize, err: serde_json::Error) -> Self {
        DecodeError::MalformedSocial {
            index,
            reason: err.to_string(),
        }
    }
}

/// Short name of a JSON value's kind, for diagnostics.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
