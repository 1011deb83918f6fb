//! Server-side error taxonomy.
//!
//! Validation and calling errors are recovered per request into a wire
//! response. Configuration errors surface from registration and
//! [`RouterBuilder::build`](crate::RouterBuilder::build) and abort startup.

use isoresource_core::{BoxError, IssuePath, PatternError, ValidationError};
use isoresource_form::FormError;

/// Why a resource call failed.
#[derive(Debug, thiserror::Error)]
pub enum CallErrorKind {
    #[error(transparent)]
    Validation(ValidationError),

    #[error("resource method failed: {0}")]
    Method(#[source] BoxError),

    #[error("unknown action")]
    UnknownAction,
}

/// A failed call through a resource, tagged with where it happened.
#[derive(Debug, thiserror::Error)]
#[error("{resource}.{action}: {kind}")]
pub struct ResourceCallingError {
    pub resource: String,
    pub action: String,
    #[source]
    pub kind: CallErrorKind,
}

impl ResourceCallingError {
    pub fn new(resource: impl Into<String>, action: impl Into<String>, kind: CallErrorKind) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            kind,
        }
    }

    /// The validation error, when input was rejected.
    pub fn validation(&self) -> Option<&ValidationError> {
        match &self.kind {
            CallErrorKind::Validation(error) => Some(error),
            _ => None,
        }
    }
}

/// Failure of a resource module loader.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The module does not exist. Tolerated for page-only resources.
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("load failed: {0}")]
    Failed(#[source] BoxError),
}

impl LoadError {
    pub fn not_found(what: impl Into<String>) -> Self {
        LoadError::NotFound { what: what.into() }
    }

    pub fn failed(error: impl Into<BoxError>) -> Self {
        LoadError::Failed(error.into())
    }
}

/// Misconfigured router. Raised at registration or build time only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("resource '{name}' is registered twice: at '{previous_path}' and at '{path}'")]
    DuplicateResource {
        name: String,
        path: String,
        previous_path: String,
    },

    #[error("action '{resource}.{action}' is declared twice")]
    DuplicateAction { resource: String, action: String },

    #[error("action '{resource}.{action}' has a resource method but no input schema")]
    MissingSchema { resource: String, action: String },

    #[error("action '{resource}.{action}' at '{path}' has neither a resource method nor a page")]
    DanglingRoute {
        resource: String,
        action: String,
        path: String,
    },

    #[error("invalid path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PatternError,
    },

    #[error("failed to load resource '{resource}': {source}")]
    Load {
        resource: String,
        #[source]
        source: LoadError,
    },
}

/// Failure while gathering request input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error("malformed JSON body: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("failed to stage request body: {0}")]
    Io(#[from] std::io::Error),
}

impl InputError {
    /// Client mistakes become validation errors; I/O failures stay fatal.
    pub fn into_validation(self) -> Result<ValidationError, InputError> {
        match self {
            InputError::Form(FormError::Validation(error)) => Ok(error),
            InputError::Form(error) => Ok(ValidationError::custom(form_issue_path(&error), error.to_string())),
            InputError::MalformedJson(error) => Ok(ValidationError::custom(IssuePath::new(), format!("malformed JSON body: {}", error))),
            io => Err(io),
        }
    }
}

fn form_issue_path(error: &FormError) -> IssuePath {
    let key = match error {
        FormError::MalformedKey { key, .. }
        | FormError::NestedUnindexedArray { key }
        | FormError::UnexpectedPath { key, .. }
        | FormError::ArrayWithoutBrackets { key, .. }
        | FormError::Conflict { key }
        | FormError::IndexOutOfRange { key, .. }
        | FormError::NestedArray { key } => key.as_str(),
        FormError::NotAnObject { .. } | FormError::Validation(_) => "",
    };
    if key.is_empty() {
        IssuePath::new()
    } else {
        vec![key.into()]
    }
}
