use std::sync::Arc;

use crate::reader::PendingRead;

/// Rejection of a read, shared by every caller of the same key.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Why a synchronous read could not return a value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Suspended {
    /// Still running. Await the read, then read again.
    #[error("read '{}' is pending", .0.key())]
    Pending(PendingRead),

    /// The read failed; the same error is returned until the key is purged.
    #[error("read failed: {0}")]
    Failed(SharedError),
}

impl Suspended {
    pub fn is_pending(&self) -> bool {
        matches!(self, Suspended::Pending(_))
    }
}

/// A cached value did not have the requested shape.
#[derive(Debug, thiserror::Error)]
#[error("cannot decode cached value of '{key}': {source}")]
pub struct DecodeError {
    pub key: String,
    #[source]
    pub source: serde_json::Error,
}
