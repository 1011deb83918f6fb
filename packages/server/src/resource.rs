//! Resources: named sets of server-side methods.
//!
//! A method receives its validated input (absent for blank-schema actions)
//! and the per-call options computed from the request. The options argument
//! is always framework-supplied and never part of the validated input.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use isoresource_core::{BoxError, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapter::Adapter;

/// A type-erased resource method.
pub type ResourceMethod<O> =
    Arc<dyn Fn(Option<Value>, O) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// The methods of one resource, keyed by action name.
pub struct Resource<O> {
    methods: BTreeMap<String, ResourceMethod<O>>,
}

impl<O> Default for Resource<O> {
    fn default() -> Self {
        Self {
            methods: BTreeMap::new(),
        }
    }
}

impl<O> fmt::Debug for Resource<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<O: Send + 'static> Resource<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method working on raw values.
    #[must_use]
    pub fn method<F, Fut>(mut self, action: impl Into<String>, method: F) -> Self
    where
        F: Fn(Option<Value>, O) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.methods
            .insert(action.into(), Arc::new(move |input, options| method(input, options).boxed()));
        self
    }

    /// Add a method with serde-typed input and output.
    ///
    /// A missing input deserializes from `null`, so blank-schema actions can
    /// take `()`.
    #[must_use]
    pub fn typed<I, R, F, Fut>(self, action: impl Into<String>, method: F) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(I, O) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        let method = Arc::new(method);
        self.method(action, move |input: Option<Value>, options: O| {
            let method = Arc::clone(&method);
            async move {
                let input: I = input.unwrap_or(Value::Null).deserialize_into()?;
                let output = method(input, options).await?;
                Ok::<Value, BoxError>(Value::from_serialize(&output)?)
            }
        })
    }

    pub fn get(&self, action: &str) -> Option<&ResourceMethod<O>> {
        self.methods.get(action)
    }

    pub fn has(&self, action: &str) -> bool {
        self.methods.contains_key(action)
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

/// What a resource loader produces: the resource plus its adapter.
pub struct ResourceModule<O> {
    pub resource: Resource<O>,
    pub adapter: Adapter<O>,
}

impl<O> ResourceModule<O> {
    pub fn new(resource: Resource<O>) -> Self {
        Self {
            resource,
            adapter: Adapter::default(),
        }
    }

    #[must_use]
    pub fn with_adapter(mut self, adapter: Adapter<O>) -> Self {
        self.adapter = adapter;
        self
    }
}

impl<O> From<Resource<O>> for ResourceModule<O> {
    fn from(resource: Resource<O>) -> Self {
        Self::new(resource)
    }
}
