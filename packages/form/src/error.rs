//! Error types for form key parsing and arranging.

use isoresource_core::ValidationError;

/// Errors raised while reconstructing nested input from flat keys.
///
/// Structural errors carry the offending form key. Arrangers do not know the
/// full key, so they leave it empty and the parser fills it in via
/// [`FormError::at_key`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("malformed form key '{key}': {message}")]
    MalformedKey { key: String, message: String },

    /// `tags[].name` style keys: arrays of arrays are not supported.
    #[error("form key '{key}': '[]' is only allowed on the last segment; nested unindexed arrays are not supported")]
    NestedUnindexedArray { key: String },

    #[error("form key '{key}': unexpected path segment '{segment}' under {found} schema")]
    UnexpectedPath {
        key: String,
        segment: String,
        found: &'static str,
    },

    #[error("form key '{key}': field '{field}' is an array and must be sent as '{field}[]'")]
    ArrayWithoutBrackets { key: String, field: String },

    #[error("form key '{key}' conflicts with a value already set at the same path")]
    Conflict { key: String },

    #[error("form key '{key}': index {index} exceeds the limit of {limit}", limit = crate::MAX_ARRAY_INDEX)]
    IndexOutOfRange { key: String, index: usize },

    /// Flattening hit an array directly inside an array.
    #[error("cannot flatten nested array at '{key}'")]
    NestedArray { key: String },

    /// Only objects flatten into form pairs.
    #[error("cannot flatten {found} into form fields; expected an object")]
    NotAnObject { found: &'static str },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl FormError {
    /// Attach the form key to a structural error that does not carry one yet.
    #[must_use]
    pub fn at_key(mut self, full_key: &str) -> Self {
        match &mut self {
            FormError::MalformedKey { key, .. }
            | FormError::NestedUnindexedArray { key }
            | FormError::UnexpectedPath { key, .. }
            | FormError::ArrayWithoutBrackets { key, .. }
            | FormError::Conflict { key }
            | FormError::IndexOutOfRange { key, .. }
            | FormError::NestedArray { key } => {
                if key.is_empty() {
                    *key = full_key.to_string();
                }
            }
            FormError::NotAnObject { .. } | FormError::Validation(_) => {}
        }
        self
    }
}
