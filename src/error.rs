//! Error taxonomy for grading requests
//!
//! Extraction misses are never errors; the extractor falls back to field
//! defaults. Everything a caller can get wrong ends up here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    /// A caller-supplied record has a value that can't be coerced to the field's type
    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Payload is neither an object nor a list of objects
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The document collaborator could not produce text from the bytes
    #[error("could not decode document: {0}")]
    DocumentDecode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GradeError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        GradeError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Field the error is attached to, when there is one
    pub fn field(&self) -> Option<&str> {
        match self {
            GradeError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GradeError>;
