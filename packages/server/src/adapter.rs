//! Per-action customisation of request handling.
//!
//! An [`AdapterEntry`] is one of three kinds:
//!
//! - [`AdapterEntry::Handler`]: takes over the whole request. No options, no
//!   validation, no resource call.
//! - [`AdapterEntry::Responder`]: keeps the default pipeline and hooks into it
//!   (`before_validation`, `after_validation`, `success`, `invalid`, `fatal`).
//! - [`AdapterEntry::Callback`]: replaces validation and the resource call with
//!   its own function, whose output then goes through the success path of its
//!   responder.
//!
//! Build them with [`handler`], [`Responder::new`] and [`callback`].

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use isoresource_core::{BoxError, ValidationError, Value};

use crate::request::{Request, RequestContext};
use crate::response::Response;

/// What a `success` hook wants done with the output.
#[derive(Debug)]
pub enum SuccessOutcome {
    /// Send this response.
    Response(Response),
    /// Let the default responder handle the original output.
    Default,
    /// Let the default responder handle this value instead of the output.
    Value(Value),
    /// Keep the response already placed with [`RequestContext::respond`].
    /// Falls back to the default responder when there is none.
    Keep,
}

impl From<Response> for SuccessOutcome {
    fn from(response: Response) -> Self {
        SuccessOutcome::Response(response)
    }
}

impl From<Value> for SuccessOutcome {
    fn from(value: Value) -> Self {
        SuccessOutcome::Value(value)
    }
}

impl From<bool> for SuccessOutcome {
    /// `false` defers to the default responder; `true` keeps the placed response.
    fn from(handled: bool) -> Self {
        if handled {
            SuccessOutcome::Keep
        } else {
            SuccessOutcome::Default
        }
    }
}

pub type SuccessHook<O> =
    Arc<dyn Fn(&mut RequestContext, Value, &O) -> Result<SuccessOutcome, BoxError> + Send + Sync>;
pub type InvalidHook =
    Arc<dyn Fn(&mut RequestContext, &ValidationError, Value) -> Result<Response, BoxError> + Send + Sync>;
pub type FatalHook =
    Arc<dyn Fn(&mut RequestContext, &(dyn Error + Send + Sync + 'static)) -> Result<Response, BoxError> + Send + Sync>;
pub type InputHook = Arc<dyn Fn(&Request, Value) -> Result<Value, BoxError> + Send + Sync>;
pub type HandlerFn = Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Response, BoxError>> + Send + Sync>;
pub type OverrideFn<O> = Arc<dyn Fn(Request, O) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// The hook set of an adapter entry. Every hook is optional.
pub struct Responder<O> {
    pub(crate) before_validation: Option<InputHook>,
    pub(crate) after_validation: Option<InputHook>,
    pub(crate) success: Option<SuccessHook<O>>,
    pub(crate) invalid: Option<InvalidHook>,
    pub(crate) fatal: Option<FatalHook>,
}

impl<O> Default for Responder<O> {
    fn default() -> Self {
        Self {
            before_validation: None,
            after_validation: None,
            success: None,
            invalid: None,
            fatal: None,
        }
    }
}

impl<O> fmt::Debug for Responder<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("before_validation", &self.before_validation.is_some())
            .field("after_validation", &self.after_validation.is_some())
            .field("success", &self.success.is_some())
            .field("invalid", &self.invalid.is_some())
            .field("fatal", &self.fatal.is_some())
            .finish()
    }
}

impl<O> Responder<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform arranged input right before the schema check.
    #[must_use]
    pub fn before_validation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.before_validation = Some(Arc::new(hook));
        self
    }

    /// Transform validated input right before the resource call.
    #[must_use]
    pub fn after_validation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.after_validation = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext, Value, &O) -> Result<SuccessOutcome, BoxError> + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(hook));
        self
    }

    /// Receives the validation error and the input with schema defaults filled.
    #[must_use]
    pub fn invalid<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext, &ValidationError, Value) -> Result<Response, BoxError> + Send + Sync + 'static,
    {
        self.invalid = Some(Arc::new(hook));
        self
    }

    /// An error from this hook falls back to the default fatal response.
    #[must_use]
    pub fn fatal<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext, &(dyn Error + Send + Sync + 'static)) -> Result<Response, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.fatal = Some(Arc::new(hook));
        self
    }
}

/// A replacement for validation plus the resource call.
pub struct RequestCallback<O> {
    pub(crate) run: OverrideFn<O>,
    pub(crate) responder: Responder<O>,
}

impl<O> RequestCallback<O> {
    /// Hooks applied to the callback's output and failures.
    #[must_use]
    pub fn responder(mut self, responder: Responder<O>) -> Self {
        self.responder = responder;
        self
    }
}

impl<O> fmt::Debug for RequestCallback<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCallback")
            .field("responder", &self.responder)
            .finish_non_exhaustive()
    }
}

/// Discriminant of an [`AdapterEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Handler,
    Responder,
    Callback,
}

/// Customisation of a single action.
pub enum AdapterEntry<O> {
    Handler(HandlerFn),
    Responder(Responder<O>),
    Callback(RequestCallback<O>),
}

impl<O> AdapterEntry<O> {
    pub fn kind(&self) -> AdapterKind {
        match self {
            AdapterEntry::Handler(_) => AdapterKind::Handler,
            AdapterEntry::Responder(_) => AdapterKind::Responder,
            AdapterEntry::Callback(_) => AdapterKind::Callback,
        }
    }

    /// Handlers and callbacks skip schema validation entirely.
    pub fn bypasses_validation(&self) -> bool {
        matches!(self, AdapterEntry::Handler(_) | AdapterEntry::Callback(_))
    }

    pub fn responder(&self) -> Option<&Responder<O>> {
        match self {
            AdapterEntry::Handler(_) => None,
            AdapterEntry::Responder(responder) => Some(responder),
            AdapterEntry::Callback(callback) => Some(&callback.responder),
        }
    }
}

impl<O> fmt::Debug for AdapterEntry<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterEntry::Handler(_) => f.write_str("Handler"),
            AdapterEntry::Responder(responder) => f.debug_tuple("Responder").field(responder).finish(),
            AdapterEntry::Callback(callback) => f.debug_tuple("Callback").field(callback).finish(),
        }
    }
}

impl<O> From<Responder<O>> for AdapterEntry<O> {
    fn from(responder: Responder<O>) -> Self {
        AdapterEntry::Responder(responder)
    }
}

impl<O> From<RequestCallback<O>> for AdapterEntry<O> {
    fn from(callback: RequestCallback<O>) -> Self {
        AdapterEntry::Callback(callback)
    }
}

/// A handler entry: the request is answered by `f` alone.
pub fn handler<O, F, Fut>(f: F) -> AdapterEntry<O>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    AdapterEntry::Handler(Arc::new(move |request| f(request).boxed()))
}

/// A callback entry producing the action output in place of the resource.
pub fn callback<O, F, Fut>(f: F) -> RequestCallback<O>
where
    F: Fn(Request, O) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    RequestCallback {
        run: Arc::new(move |request, options| f(request, options).boxed()),
        responder: Responder::default(),
    }
}

/// The adapter entries of one resource, keyed by action name.
pub struct Adapter<O> {
    entries: BTreeMap<String, AdapterEntry<O>>,
}

impl<O> Default for Adapter<O> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<O> fmt::Debug for Adapter<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<O> Adapter<O> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on(mut self, action: impl Into<String>, entry: impl Into<AdapterEntry<O>>) -> Self {
        self.entries.insert(action.into(), entry.into());
        self
    }

    pub fn get(&self, action: &str) -> Option<&AdapterEntry<O>> {
        self.entries.get(action)
    }

    pub(crate) fn take(&mut self, action: &str) -> Option<AdapterEntry<O>> {
        self.entries.remove(action)
    }

    pub(crate) fn remaining(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn entry_kinds() {
        let entry: AdapterEntry<()> = handler(|_request| async { Ok::<_, BoxError>(Response::text(StatusCode::OK, "hi")) });
        assert_eq!(entry.kind(), AdapterKind::Handler);
        assert!(entry.bypasses_validation());
        assert!(entry.responder().is_none());

        let entry: AdapterEntry<()> = Responder::new()
            .success(|_ctx, _output, _options| Ok(SuccessOutcome::Default))
            .into();
        assert_eq!(entry.kind(), AdapterKind::Responder);
        assert!(!entry.bypasses_validation());
        assert!(entry.responder().is_some_and(|r| r.success.is_some()));

        let entry: AdapterEntry<()> = callback(|_request, _options| async { Ok::<_, BoxError>(Value::Null) }).into();
        assert_eq!(entry.kind(), AdapterKind::Callback);
        assert!(entry.bypasses_validation());
    }

    #[test]
    fn bool_outcomes() {
        assert!(matches!(SuccessOutcome::from(false), SuccessOutcome::Default));
        assert!(matches!(SuccessOutcome::from(true), SuccessOutcome::Keep));
    }

    #[test]
    fn adapter_lookup() {
        let mut adapter: Adapter<()> = Adapter::new().on("create", Responder::new());
        assert!(adapter.get("create").is_some());
        assert!(adapter.take("create").is_some());
        assert_eq!(adapter.remaining().count(), 0);
    }
}
