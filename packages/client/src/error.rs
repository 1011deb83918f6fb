//! Typed failures of remote calls.
//!
//! The wire envelope is turned back into the same taxonomy the server uses,
//! so callers match on variants instead of inspecting messages.

use isoresource_core::{PatternError, ValidationError};
use isoresource_form::FormError;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Input rejected, either locally before sending or by the server (422).
    #[error(transparent)]
    Validation(ValidationError),

    /// Any other 4xx.
    #[error("client error {status}: {message}")]
    Client { status: u16, message: String },

    /// 5xx, or any other non-success status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// A success status with a body that is not a success envelope.
    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("resource '{resource}' has no action '{action}'")]
    UnknownAction { resource: String, action: String },

    #[error("cannot build request path: {0}")]
    MissingPathParam(#[source] PatternError),

    #[error("cannot encode query: {0}")]
    Query(#[from] FormError),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RemoteError {
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            RemoteError::Validation(error) => Some(error),
            _ => None,
        }
    }

    /// HTTP status of server-reported failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Client { status, .. } | RemoteError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<PatternError> for RemoteError {
    fn from(error: PatternError) -> Self {
        RemoteError::MissingPathParam(error)
    }
}
