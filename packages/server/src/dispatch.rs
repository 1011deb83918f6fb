//! The per-request state machine.
//!
//! A dispatched request ends in one of three states:
//!
//! - **success**: the resource method (or a callback) produced output. The
//!   `success` hook may answer itself, defer to the default responder, hand
//!   it a replacement value, or keep a response it already placed.
//! - **invalid**: input was rejected. The `invalid` hook or the default
//!   responder sees the error once, together with the input completed with
//!   schema defaults. Default is HTTP 422 with the error envelope.
//! - **fatal**: anything else. The `fatal` hook runs under its own error
//!   boundary; when it fails too, the default responder answers. Production
//!   hides error details.
//!
//! Page actions answer non-JSON callers with a rendered page; every other
//! caller gets the JSON envelope.

use std::error::Error;
use std::sync::Arc;

use http::StatusCode;
use isoresource_core::{BoxError, ValidationError, Value};
use tracing::Instrument;

use crate::adapter::{AdapterEntry, Responder, SuccessOutcome};
use crate::app::{AppContext, PageView};
use crate::error::{CallErrorKind, ResourceCallingError};
use crate::input::arrange_input;
use crate::request::{Request, RequestContext};
use crate::response::{envelope, Response};
use crate::table::{Route, RouteTable};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// How a call failed before a response was chosen.
enum Failure {
    /// Rejected input, with the input completed with schema defaults.
    Invalid { error: ValidationError, input: Value },
    Fatal(BoxError),
}

impl Failure {
    /// A `ValidationError` raised anywhere is invalid input.
    fn classify(error: BoxError, input: Value) -> Self {
        match error.downcast::<ValidationError>() {
            Ok(error) => Failure::Invalid { error: *error, input },
            Err(error) => Failure::Fatal(error),
        }
    }

    fn from_method<O>(route: &Route<O>, error: BoxError, input: Value) -> Self {
        match Failure::classify(error, input) {
            Failure::Fatal(error) => Failure::Fatal(Box::new(ResourceCallingError::new(
                route.resource.as_str(),
                route.action(),
                CallErrorKind::Method(error),
            ))),
            invalid => invalid,
        }
    }
}

/// Routes requests through a frozen [`RouteTable`].
pub struct Dispatcher<O> {
    table: Arc<RouteTable<O>>,
    app: Arc<AppContext<O>>,
}

impl<O> Clone for Dispatcher<O> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            app: Arc::clone(&self.app),
        }
    }
}

impl<O> Dispatcher<O>
where
    O: Clone + Send + Sync + 'static,
{
    pub fn new(table: impl Into<Arc<RouteTable<O>>>, app: impl Into<Arc<AppContext<O>>>) -> Self {
        Self {
            table: table.into(),
            app: app.into(),
        }
    }

    pub fn table(&self) -> &RouteTable<O> {
        &self.table
    }

    pub fn app(&self) -> &AppContext<O> {
        &self.app
    }

    /// Match `request` against the table and dispatch it.
    pub async fn handle(&self, mut request: Request) -> Response {
        let Some(found) = self.table.find(request.method, &request.path) else {
            tracing::debug!(
                target: DISPATCH_TARGET,
                method = request.method.as_str(),
                path = %request.path,
                "no route"
            );
            return self.not_found(&request).await;
        };
        request.params = found.params;
        self.dispatch(&found.route, request).await
    }

    /// Dispatch `request` to a known route. Path parameters must already be
    /// in `request.params`.
    pub async fn dispatch(&self, route: &Route<O>, request: Request) -> Response {
        let span = tracing::debug_span!(
            target: DISPATCH_TARGET,
            "dispatch",
            resource = %route.resource,
            action = %route.action(),
            method = request.method.as_str(),
            path = %request.path
        );
        self.run(route, request).instrument(span).await
    }

    async fn run(&self, route: &Route<O>, request: Request) -> Response {
        if let Some(AdapterEntry::Handler(handler)) = route.adapter() {
            tracing::debug!(target: DISPATCH_TARGET, "handled by adapter");
            return match handler(request.clone()).await {
                Ok(response) => response,
                Err(error) => {
                    log_fatal(&*error);
                    self.default_fatal(route, &request, &*error).await
                }
            };
        }

        let responder = route.adapter().and_then(AdapterEntry::responder);
        let mut ctx = RequestContext::new(request);

        let options = match self.app.options(&ctx.request).await {
            Ok(options) => options,
            Err(error) => return self.respond_fatal(route, responder, &mut ctx, error).await,
        };

        match self.invoke(route, responder, &ctx.request, options.clone()).await {
            Ok(output) => self.respond_success(route, responder, &mut ctx, output, &options).await,
            Err(Failure::Invalid { error, input }) => {
                self.respond_invalid(route, responder, &mut ctx, &error, input).await
            }
            Err(Failure::Fatal(error)) => self.respond_fatal(route, responder, &mut ctx, error).await,
        }
    }

    /// Produce the action output: callback, page, blank call or the full
    /// arrange, validate, call sequence.
    async fn invoke(
        &self,
        route: &Route<O>,
        responder: Option<&Responder<O>>,
        request: &Request,
        options: O,
    ) -> Result<Value, Failure> {
        if let Some(AdapterEntry::Callback(callback)) = route.adapter() {
            tracing::debug!(target: DISPATCH_TARGET, "overridden by callback");
            return (callback.run)(request.clone(), options)
                .await
                .map_err(|error| Failure::classify(error, Value::Undefined));
        }

        let Some(method) = route.method.as_ref() else {
            return Ok(Value::Undefined);
        };

        let schema = route.schema();
        if schema.is_blank() {
            return method(None, options)
                .await
                .map_err(|error| Failure::from_method(route, error, Value::Undefined));
        }

        let sources = route.input.sources_for(request.method);
        // Staged uploads live until the method returns.
        let (input, _cleanup) = match arrange_input(request, &sources, schema, &self.app.config).await {
            Ok(arranged) => arranged,
            Err(error) => {
                return Err(match error.into_validation() {
                    Ok(error) => Failure::Invalid {
                        error,
                        input: schema.complete(&Value::Undefined),
                    },
                    Err(error) => Failure::Fatal(error.into()),
                })
            }
        };

        let input = match responder.and_then(|r| r.before_validation.as_ref()) {
            Some(hook) => hook(request, input).map_err(|error| Failure::classify(error, Value::Undefined))?,
            None => input,
        };
        let validated = schema.parse(&input).map_err(|error| Failure::Invalid {
            error,
            input: schema.complete(&input),
        })?;
        let validated = match responder.and_then(|r| r.after_validation.as_ref()) {
            Some(hook) => hook(request, validated).map_err(|error| Failure::classify(error, Value::Undefined))?,
            None => validated,
        };

        tracing::debug!(target: DISPATCH_TARGET, "calling resource method");
        method(Some(validated), options)
            .await
            .map_err(|error| Failure::from_method(route, error, schema.complete(&input)))
    }

    async fn respond_success(
        &self,
        route: &Route<O>,
        responder: Option<&Responder<O>>,
        ctx: &mut RequestContext,
        output: Value,
        options: &O,
    ) -> Response {
        let output = match responder.and_then(|r| r.success.as_ref()) {
            None => output,
            Some(hook) => match hook(ctx, output.clone(), options) {
                Ok(SuccessOutcome::Response(response)) => return response,
                Ok(SuccessOutcome::Default) => output,
                Ok(SuccessOutcome::Value(value)) => value,
                Ok(SuccessOutcome::Keep) => match ctx.take_response() {
                    Some(response) => return response,
                    None => {
                        tracing::debug!(target: DISPATCH_TARGET, "success hook kept no response");
                        output
                    }
                },
                Err(error) => return self.respond_fatal(route, responder, ctx, error).await,
            },
        };

        if self.wants_page(route, &ctx.request) {
            if let Some(renderer) = self.app.renderer() {
                let view = PageView {
                    resource: &route.resource,
                    action: route.action(),
                    data: &output,
                    errors: None,
                    status: StatusCode::OK,
                };
                return match renderer.render(&ctx.request, view).await {
                    Ok(response) => response,
                    Err(error) => {
                        log_fatal(&*error);
                        self.default_fatal(route, &ctx.request, &*error).await
                    }
                };
            }
        }
        Response::json(StatusCode::OK, &envelope::success(output))
    }

    async fn respond_invalid(
        &self,
        route: &Route<O>,
        responder: Option<&Responder<O>>,
        ctx: &mut RequestContext,
        error: &ValidationError,
        input: Value,
    ) -> Response {
        tracing::debug!(target: DISPATCH_TARGET, issues = error.issues.len(), "input rejected");

        if let Some(hook) = responder.and_then(|r| r.invalid.as_ref()) {
            return match hook(ctx, error, input) {
                Ok(response) => response,
                Err(hook_error) => self.respond_fatal(route, responder, ctx, hook_error).await,
            };
        }

        if self.wants_page(route, &ctx.request) {
            if let Some(renderer) = self.app.renderer() {
                let view = PageView {
                    resource: &route.resource,
                    action: route.action(),
                    data: &input,
                    errors: Some(error),
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                };
                match renderer.render(&ctx.request, view).await {
                    Ok(response) => return response,
                    Err(render_error) => {
                        log_fatal(&*render_error);
                        return self.default_fatal(route, &ctx.request, &*render_error).await;
                    }
                }
            }
        }
        Response::json(StatusCode::UNPROCESSABLE_ENTITY, &envelope::invalid(error))
    }

    async fn respond_fatal(
        &self,
        route: &Route<O>,
        responder: Option<&Responder<O>>,
        ctx: &mut RequestContext,
        error: BoxError,
    ) -> Response {
        log_fatal(&*error);
        if let Some(hook) = responder.and_then(|r| r.fatal.as_ref()) {
            match hook(ctx, &*error) {
                Ok(response) => return response,
                Err(hook_error) => tracing::error!(
                    target: DISPATCH_TARGET,
                    error = %error_chain(&*hook_error),
                    "fatal hook failed"
                ),
            }
        }
        self.default_fatal(route, &ctx.request, &*error).await
    }

    async fn default_fatal(
        &self,
        route: &Route<O>,
        request: &Request,
        error: &(dyn Error + Send + Sync + 'static),
    ) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let message = self.fatal_message(error);
        if self.wants_page(route, request) {
            if let Some(renderer) = self.app.renderer() {
                match renderer.render_error(request, status, &message).await {
                    Ok(response) => return response,
                    Err(render_error) => tracing::error!(
                        target: DISPATCH_TARGET,
                        error = %error_chain(&*render_error),
                        "error page failed to render"
                    ),
                }
            }
        }
        Response::json(status, &envelope::fatal(Some(&message)))
    }

    async fn not_found(&self, request: &Request) -> Response {
        let status = StatusCode::NOT_FOUND;
        let message = format!("no route for {} {}", request.method.as_str(), request.path);
        if !request.wants_json() {
            if let Some(renderer) = self.app.renderer() {
                if let Ok(response) = renderer.render_error(request, status, &message).await {
                    return response;
                }
            }
        }
        Response::json(status, &envelope::fatal(Some(&message)))
    }

    fn wants_page(&self, route: &Route<O>, request: &Request) -> bool {
        route.renders_page() && !request.wants_json()
    }

    fn fatal_message(&self, error: &(dyn Error + 'static)) -> String {
        let config = &self.app.config;
        if config.environment.is_production() {
            config.fatal_message.clone()
        } else {
            error_chain(error)
        }
    }
}

fn log_fatal(error: &(dyn Error + 'static)) {
    tracing::error!(target: DISPATCH_TARGET, error = %error_chain(error), "request failed");
}

/// `error: source: source...`
pub(crate) fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    #[derive(Debug, thiserror::Error)]
    #[error("query failed")]
    struct Query(#[source] Refused);

    #[test]
    fn chains_sources() {
        assert_eq!(error_chain(&Query(Refused)), "query failed: connection refused");
    }

    #[test]
    fn calling_errors_are_not_repeated() {
        let error = ResourceCallingError::new("tasks", "create", CallErrorKind::Method(Box::new(Refused)));
        let chain = error_chain(&error);
        assert_eq!(chain, "tasks.create: resource method failed: connection refused");
    }

    #[test]
    fn validation_errors_classify_as_invalid() {
        let error: BoxError = Box::new(ValidationError::custom(vec!["title".into()], "taken"));
        assert!(matches!(Failure::classify(error, Value::Undefined), Failure::Invalid { .. }));
        let error: BoxError = Box::new(Refused);
        assert!(matches!(Failure::classify(error, Value::Undefined), Failure::Fatal(_)));
    }
}
