//! Read-or-suspend cache of resource calls.
//!
//! One `SuspenseCache` lives per rendering context: one per server request,
//! one per client page. Rendering code reads through it either synchronously
//! with [`SuspenseCache::suspend`] (and awaits the returned [`PendingRead`]
//! before rendering again) or asynchronously with
//! [`SuspenseCache::get_or_fetch`]. Both share entries, so a key is fetched at
//! most once until it is purged.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use isoresource_core::{BoxError, ResourceProxy, Value};
use serde::de::DeserializeOwned;

use crate::error::{DecodeError, SharedError, Suspended};
use crate::key::cache_key;
use crate::reader::{PendingRead, ReadState};
use crate::transfer::TransferCache;
use crate::SUSPENSE_TARGET;

/// Which entries [`SuspenseCache::purge`] drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purge {
    All,
    /// Keys starting with the prefix, e.g. `"task#"` for one resource.
    StartsWith(String),
    /// Exactly these keys.
    Keys(BTreeSet<String>),
    /// Every key except these.
    Except(BTreeSet<String>),
}

impl Purge {
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Purge::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn except<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Purge::Except(keys.into_iter().map(Into::into).collect())
    }

    fn applies_to(&self, key: &str) -> bool {
        match self {
            Purge::All => true,
            Purge::StartsWith(prefix) => key.starts_with(prefix.as_str()),
            Purge::Keys(keys) => keys.contains(key),
            Purge::Except(keys) => !keys.contains(key),
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, ReadState>>,
    transfer: TransferCache,
}

/// Cloning shares the entries.
#[derive(Clone, Default)]
pub struct SuspenseCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SuspenseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuspenseCache")
            .field("entries", &self.len())
            .field("transfer", &self.inner.transfer)
            .finish()
    }
}

impl SuspenseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that serves values transferred from server rendering before
    /// running any producer.
    pub fn with_transfer(transfer: TransferCache) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::default(),
                transfer,
            }),
        }
    }

    pub fn transfer(&self) -> &TransferCache {
        &self.inner.transfer
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, ReadState>> {
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read `key`, starting `producer` if nothing is cached.
    ///
    /// Returns the value once resolved. Before that, every call returns
    /// `Suspended::Pending` with the same [`PendingRead`]; the producer runs
    /// when that read is first awaited. A rejection is returned as
    /// `Suspended::Failed` until the key is purged.
    pub fn suspend<F, Fut, E>(&self, key: &str, producer: F) -> Result<Value, Suspended>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let mut entries = self.entries();
        if let Some(state) = entries.get_mut(key) {
            state.settle();
            return match state {
                ReadState::Resolved(value) => Ok(value.clone()),
                ReadState::Rejected(error) => Err(Suspended::Failed(Arc::clone(error))),
                ReadState::Pending(pending) => Err(Suspended::Pending(pending.clone())),
            };
        }

        if let Some(value) = self.inner.transfer.take(key) {
            tracing::debug!(target: SUSPENSE_TARGET, key, "served from transfer cache");
            entries.insert(key.to_string(), ReadState::Resolved(value.clone()));
            return Ok(value);
        }

        tracing::debug!(target: SUSPENSE_TARGET, key, "starting read");
        let future = producer();
        let pending = PendingRead::new(key.to_string(), async move {
            future.await.map_err(|error| {
                let error: BoxError = error.into();
                SharedError::from(error)
            })
        });
        entries.insert(key.to_string(), ReadState::Pending(pending.clone()));
        Err(Suspended::Pending(pending))
    }

    /// Await-based access to the same entries as [`SuspenseCache::suspend`].
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, producer: F) -> Result<Value, SharedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        match self.suspend(key, producer) {
            Ok(value) => Ok(value),
            Err(Suspended::Failed(error)) => Err(error),
            Err(Suspended::Pending(pending)) => {
                let outcome = pending.clone().await;
                self.settle(&pending);
                outcome
            }
        }
    }

    /// Typed variant of [`SuspenseCache::suspend`].
    pub fn read_as<T, F, Fut, E>(&self, key: &str, producer: F) -> Result<T, Suspended>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let value = self.suspend(key, producer)?;
        decode(key, value).map_err(Suspended::Failed)
    }

    /// Typed variant of [`SuspenseCache::get_or_fetch`].
    pub async fn fetch_as<T, F, Fut, E>(&self, key: &str, producer: F) -> Result<T, SharedError>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let value = self.get_or_fetch(key, producer).await?;
        decode(key, value)
    }

    /// Read `proxy.action(input)` keyed by [`cache_key`].
    ///
    /// Works the same for local and remote proxies.
    pub fn suspend_call<P>(&self, proxy: &Arc<P>, action: &str, input: Value) -> Result<Value, Suspended>
    where
        P: ResourceProxy + 'static,
    {
        let key = cache_key(proxy.resource(), action, &input);
        self.suspend(&key, call_producer(proxy, action, input))
    }

    /// Await-based variant of [`SuspenseCache::suspend_call`].
    pub async fn fetch_call<P>(&self, proxy: &Arc<P>, action: &str, input: Value) -> Result<Value, SharedError>
    where
        P: ResourceProxy + 'static,
    {
        let key = cache_key(proxy.resource(), action, &input);
        self.get_or_fetch(&key, call_producer(proxy, action, input)).await
    }

    /// The settled value of `key`, without starting anything.
    pub fn peek(&self, key: &str) -> Option<Result<Value, SharedError>> {
        let mut entries = self.entries();
        let state = entries.get_mut(key)?;
        state.settle();
        match state {
            ReadState::Resolved(value) => Some(Ok(value.clone())),
            ReadState::Rejected(error) => Some(Err(Arc::clone(error))),
            ReadState::Pending(_) => None,
        }
    }

    /// Resolved entries, for transferring to the client.
    pub fn resolved(&self) -> Vec<(String, Value)> {
        let mut entries = self.entries();
        let mut resolved: Vec<_> = entries
            .iter_mut()
            .filter_map(|(key, state)| {
                state.settle();
                match state {
                    ReadState::Resolved(value) => Some((key.clone(), value.clone())),
                    _ => None,
                }
            })
            .collect();
        resolved.sort_by(|a, b| a.0.cmp(&b.0));
        resolved
    }

    /// Drop entries. Pending reads already handed out still complete for
    /// their holders; the next read of a purged key starts a new producer.
    pub fn purge(&self, purge: Purge) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !purge.applies_to(key));
        let purged = before - entries.len();
        tracing::debug!(target: SUSPENSE_TARGET, ?purge, purged, "purged reads");
        purged
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Settle the entry of `pending` if it is still the one cached.
    fn settle(&self, pending: &PendingRead) {
        let mut entries = self.entries();
        if let Some(state) = entries.get_mut(pending.key()) {
            if matches!(state, ReadState::Pending(current) if current.same_read(pending)) {
                state.settle();
            }
        }
    }
}

fn call_producer<P>(
    proxy: &Arc<P>,
    action: &str,
    input: Value,
) -> impl FnOnce() -> BoxFuture<'static, Result<Value, BoxError>>
where
    P: ResourceProxy + 'static,
{
    let proxy = Arc::clone(proxy);
    let action = action.to_string();
    move || {
        async move {
            proxy
                .call(&action, Some(input))
                .await
                .map_err(|error| Box::new(error) as BoxError)
        }
        .boxed()
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, SharedError> {
    value.deserialize_into().map_err(|source| {
        Arc::new(DecodeError {
            key: key.to_string(),
            source,
        }) as SharedError
    })
}
