//! In-process calls through the same convention as remote ones.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use isoresource_core::{BoxError, ResourceProxy, ValidationError, Value};

use crate::dispatch::{Dispatcher, DISPATCH_TARGET};
use crate::error::{CallErrorKind, ResourceCallingError};
use crate::request::Request;
use crate::table::{Route, RouteTable};

/// Calls a mounted resource directly, validating input first and passing the
/// bound options as the trailing argument.
pub struct LocalProxy<O> {
    resource: String,
    routes: BTreeMap<String, Arc<Route<O>>>,
    options: O,
}

impl<O: Clone> LocalProxy<O> {
    /// The same resource bound to other options.
    pub fn with_options(&self, options: O) -> Self {
        Self {
            resource: self.resource.clone(),
            routes: self.routes.clone(),
            options,
        }
    }

    pub fn options(&self) -> &O {
        &self.options
    }

    /// Actions that can be called locally.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.routes
            .iter()
            .filter(|(_, route)| route.has_method())
            .map(|(action, _)| action.as_str())
    }

    fn fail(&self, action: &str, kind: CallErrorKind) -> ResourceCallingError {
        ResourceCallingError::new(self.resource.as_str(), action, kind)
    }
}

impl<O> fmt::Debug for LocalProxy<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalProxy")
            .field("resource", &self.resource)
            .field("actions", &self.routes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<O> ResourceProxy for LocalProxy<O>
where
    O: Clone + Send + Sync + 'static,
{
    type Error = ResourceCallingError;

    fn resource(&self) -> &str {
        &self.resource
    }

    async fn call(&self, action: &str, input: Option<Value>) -> Result<Value, ResourceCallingError> {
        let route = self
            .routes
            .get(action)
            .ok_or_else(|| self.fail(action, CallErrorKind::UnknownAction))?;
        let method = route
            .method
            .as_ref()
            .ok_or_else(|| self.fail(action, CallErrorKind::UnknownAction))?;

        let schema = route.schema();
        let input = if schema.is_blank() {
            None
        } else {
            let input = input.unwrap_or_else(Value::map);
            let validated = schema
                .parse(&input)
                .map_err(|error| self.fail(action, CallErrorKind::Validation(error)))?;
            Some(validated)
        };

        tracing::debug!(target: DISPATCH_TARGET, resource = %self.resource, action, "local call");
        method(input, self.options.clone())
            .await
            .map_err(|error| match error.downcast::<ValidationError>() {
                Ok(error) => self.fail(action, CallErrorKind::Validation(*error)),
                Err(error) => self.fail(action, CallErrorKind::Method(error)),
            })
    }
}

impl<O> RouteTable<O> {
    /// A proxy calling `resource` in-process with `options`.
    pub fn local_proxy(&self, resource: &str, options: O) -> Option<LocalProxy<O>> {
        let routes: BTreeMap<_, _> = self
            .resource_routes(resource)
            .map(|route| (route.action().to_string(), Arc::clone(route)))
            .collect();
        if routes.is_empty() {
            return None;
        }
        Some(LocalProxy {
            resource: resource.to_string(),
            routes,
            options,
        })
    }
}

impl<O> Dispatcher<O>
where
    O: Clone + Send + Sync + 'static,
{
    /// A local proxy bound to the options the host derives from `request`.
    pub async fn local_proxy(&self, resource: &str, request: &Request) -> Result<LocalProxy<O>, BoxError> {
        let options = self.app().options(request).await?;
        self.table()
            .local_proxy(resource, options)
            .ok_or_else(|| format!("unknown resource '{}'", resource).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ResourceRouteConfig, RouterBuilder};
    use crate::resource::Resource;
    use isoresource_core::{ActionDescriptor, InputDescriptor, Method, Schema};

    async fn table() -> RouteTable<i64> {
        let counter = Resource::<i64>::new()
            .method("add", |input, base| async move {
                let amount = match input.as_ref().and_then(|v| v.get("amount")) {
                    Some(Value::Integer(amount)) => *amount,
                    _ => 0,
                };
                Ok::<_, BoxError>(Value::Integer(base + amount))
            })
            .method("base", |input, base| async move {
                assert!(input.is_none());
                Ok::<_, BoxError>(Value::Integer(base))
            });
        let config = ResourceRouteConfig::new("counter")
            .action(ActionDescriptor::new("add", "/add", Method::POST))
            .action(ActionDescriptor::new("base", "/", Method::GET))
            .action(ActionDescriptor::new("chart", "/chart", Method::GET).page())
            .input(
                "add",
                InputDescriptor::new(Schema::object([("amount", Schema::integer().min(1.0))])),
            )
            .input("base", InputDescriptor::blank());
        let mut router = RouterBuilder::<i64>::new();
        router.mount("/counter", config, counter).unwrap();
        router.build().await.unwrap()
    }

    #[tokio::test]
    async fn calls_with_options() {
        let proxy = table().await.local_proxy("counter", 10).unwrap();
        let output = proxy
            .call("add", Some(Value::object([("amount", Value::Integer(5))])))
            .await
            .unwrap();
        assert_eq!(output, Value::Integer(15));
        assert_eq!(proxy.with_options(1).call("base", None).await.unwrap(), Value::Integer(1));
    }

    #[tokio::test]
    async fn blank_actions_ignore_input() {
        let proxy = table().await.local_proxy("counter", 3).unwrap();
        let output = proxy.call("base", Some(Value::from("ignored"))).await.unwrap();
        assert_eq!(output, Value::Integer(3));
    }

    #[tokio::test]
    async fn rejects_invalid_input_before_calling() {
        let proxy = table().await.local_proxy("counter", 0).unwrap();
        let error = proxy
            .call("add", Some(Value::object([("amount", Value::Integer(0))])))
            .await
            .unwrap_err();
        assert_eq!(error.resource, "counter");
        assert_eq!(error.action, "add");
        assert_eq!(error.validation().unwrap().issues[0].dotted_path(), "amount");
    }

    #[tokio::test]
    async fn pages_and_unknown_actions_are_not_callable() {
        let proxy = table().await.local_proxy("counter", 0).unwrap();
        for action in ["chart", "missing"] {
            let error = proxy.call(action, None).await.unwrap_err();
            assert!(matches!(error.kind, CallErrorKind::UnknownAction));
        }
        assert_eq!(proxy.actions().collect::<Vec<_>>(), vec!["add", "base"]);
        assert!(table().await.local_proxy("nope", 0).is_none());
    }

    #[derive(serde::Serialize)]
    struct Add {
        amount: i64,
    }

    #[tokio::test]
    async fn typed_calls() {
        let proxy = table().await.local_proxy("counter", 1).unwrap();
        let total: i64 = proxy.call_as("add", &Add { amount: 2 }).await.unwrap();
        assert_eq!(total, 3);
    }
}
