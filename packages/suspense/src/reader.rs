//! The per-key read cell.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use isoresource_core::Value;

use crate::error::SharedError;

pub(crate) type ReadFuture = Shared<BoxFuture<'static, Result<Value, SharedError>>>;

/// The one in-flight read of a key.
///
/// Every caller that reads the key before it settles gets a clone of the same
/// `PendingRead`; awaiting any of them drives the single producer.
#[derive(Clone)]
pub struct PendingRead {
    key: String,
    future: ReadFuture,
}

impl PendingRead {
    pub(crate) fn new<Fut>(key: String, future: Fut) -> Self
    where
        Fut: Future<Output = Result<Value, SharedError>> + Send + 'static,
    {
        Self {
            key,
            future: future.boxed().shared(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether both handles wait on the same producer.
    pub fn same_read(&self, other: &PendingRead) -> bool {
        self.future.ptr_eq(&other.future)
    }

    /// The outcome, once some caller has driven the read to completion.
    pub(crate) fn outcome(&self) -> Option<Result<Value, SharedError>> {
        self.future.peek().cloned()
    }
}

impl Future for PendingRead {
    type Output = Result<Value, SharedError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.future).poll(cx)
    }
}

impl fmt::Debug for PendingRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRead")
            .field("key", &self.key)
            .field("settled", &self.future.peek().is_some())
            .finish()
    }
}

/// State of one cache entry.
#[derive(Debug, Clone)]
pub(crate) enum ReadState {
    Pending(PendingRead),
    Resolved(Value),
    Rejected(SharedError),
}

impl ReadState {
    /// Move a pending read that has finished into its settled state.
    pub(crate) fn settle(&mut self) {
        if let ReadState::Pending(pending) = self {
            match pending.outcome() {
                Some(Ok(value)) => *self = ReadState::Resolved(value),
                Some(Err(error)) => *self = ReadState::Rejected(error),
                None => {}
            }
        }
    }
}
