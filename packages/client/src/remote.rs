//! Remote proxies: a resource manifest turned into HTTP calls.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use isoresource_core::{
    json_to_value, value_to_json, ActionDescriptor, Issue, PathPattern, ResourceManifest, ResourceProxy,
    Schema, ValidationError, Value,
};
use isoresource_form::flatten;

use crate::config::ClientConfig;
use crate::error::RemoteError;
use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::types::{HttpRequest, HttpResponse};
use crate::CLIENT_TARGET;

/// Header the server uses to negotiate the JSON envelope.
pub const REQUESTED_WITH: &str = "X-Requested-With";

struct RemoteAction {
    descriptor: ActionDescriptor,
    schema: Schema,
    /// Mount path joined with the action path.
    pattern: PathPattern,
}

/// Calls a resource over HTTP with the same convention as a local proxy.
pub struct RemoteProxy<E = ReqwestExecutor> {
    resource: String,
    actions: BTreeMap<String, RemoteAction>,
    config: Arc<ClientConfig>,
    executor: Arc<E>,
}

impl<E> fmt::Debug for RemoteProxy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteProxy")
            .field("resource", &self.resource)
            .field("base_url", &self.config.base_url.as_str())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<E: HttpExecutor> RemoteProxy<E> {
    pub fn new(
        manifest: &ResourceManifest,
        config: Arc<ClientConfig>,
        executor: Arc<E>,
    ) -> Result<Self, RemoteError> {
        let mount = PathPattern::parse(&manifest.path)
            .map_err(|e| RemoteError::Manifest(format!("{}: {}", manifest.path, e)))?;
        let mut actions = BTreeMap::new();
        for action in &manifest.actions {
            let descriptor = &action.descriptor;
            let path = PathPattern::parse(&descriptor.path)
                .map_err(|e| RemoteError::Manifest(format!("{}.{}: {}", manifest.name, descriptor.action, e)))?;
            actions.insert(
                descriptor.action.clone(),
                RemoteAction {
                    descriptor: descriptor.clone(),
                    schema: action.schema.clone(),
                    pattern: mount.join(&path),
                },
            );
        }
        Ok(Self {
            resource: manifest.name.clone(),
            actions,
            config,
            executor,
        })
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Build the request for `action` without sending it.
    ///
    /// Path parameters are taken from the input and left out of the payload.
    /// Query verbs carry the rest as flattened form pairs; other verbs as a
    /// JSON body. Input is validated first, so invalid calls never leave the
    /// process.
    pub fn prepare(&self, action: &str, input: Option<Value>) -> Result<HttpRequest, RemoteError> {
        let remote = self.actions.get(action).ok_or_else(|| RemoteError::UnknownAction {
            resource: self.resource.clone(),
            action: action.to_string(),
        })?;
        let method = remote.descriptor.primary_method();
        let input = input.unwrap_or_else(Value::map);

        let (path, consumed) = remote.pattern.fill(&input)?;
        let mut request = HttpRequest::new(method, self.config.url_for(&path).to_string());
        request.headers.push(("Accept".to_string(), "application/json".to_string()));
        request.headers.push((REQUESTED_WITH.to_string(), "XMLHttpRequest".to_string()));
        request.headers.extend(self.config.headers.iter().cloned());

        if remote.schema.is_blank() {
            return Ok(request);
        }

        let mut payload = remote.schema.parse(&input).map_err(RemoteError::Validation)?;
        if let Some(map) = payload.as_map_mut() {
            for key in &consumed {
                map.remove(key);
            }
        }

        if method.uses_query() {
            request.query = flatten(&payload)?;
        } else if !payload.is_undefined() {
            request.body = Some(value_to_json(payload));
        }
        Ok(request)
    }
}

#[async_trait]
impl<E> ResourceProxy for RemoteProxy<E>
where
    E: HttpExecutor + 'static,
{
    type Error = RemoteError;

    fn resource(&self) -> &str {
        &self.resource
    }

    async fn call(&self, action: &str, input: Option<Value>) -> Result<Value, RemoteError> {
        let request = self.prepare(action, input)?;
        tracing::debug!(
            target: CLIENT_TARGET,
            resource = %self.resource,
            action,
            method = request.method.as_str(),
            url = %request.url,
            "remote call"
        );
        let response = self
            .executor
            .execute(&request)
            .await
            .map_err(RemoteError::Transport)?;
        unwrap_envelope(&response)
    }
}

/// Turn a response envelope back into the call's outcome.
pub fn unwrap_envelope(response: &HttpResponse) -> Result<Value, RemoteError> {
    let body = response.body_json();

    if response.is_success() {
        return match body {
            Some(serde_json::Value::Object(mut envelope))
                if envelope.get("status").and_then(|s| s.as_str()) == Some("success") =>
            {
                Ok(envelope
                    .remove("data")
                    .map(json_to_value)
                    .unwrap_or(Value::Undefined))
            }
            _ => Err(RemoteError::Protocol(format!(
                "status {} without a success envelope",
                response.status
            ))),
        };
    }

    if response.status == 422 {
        let issues = body
            .as_ref()
            .and_then(|body| body.get("errors"))
            .and_then(|errors| serde_json::from_value::<Vec<Issue>>(errors.clone()).ok());
        if let Some(issues) = issues {
            return Err(RemoteError::Validation(ValidationError::new(issues)));
        }
    }

    let message = body
        .as_ref()
        .and_then(|body| body.get("message"))
        .and_then(|message| message.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| response.body_text.clone());
    tracing::debug!(target: CLIENT_TARGET, status = response.status, %message, "remote call failed");

    if (400..500).contains(&response.status) {
        Err(RemoteError::Client {
            status: response.status,
            message,
        })
    } else {
        Err(RemoteError::Server {
            status: response.status,
            message,
        })
    }
}

/// Shared configuration and connection for a family of remote proxies.
pub struct RemoteClient<E = ReqwestExecutor> {
    config: Arc<ClientConfig>,
    executor: Arc<E>,
}

impl<E> Clone for RemoteClient<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl RemoteClient<ReqwestExecutor> {
    pub fn new(config: ClientConfig) -> Result<Self, RemoteError> {
        let executor = ReqwestExecutor::new(config.timeout).map_err(RemoteError::Transport)?;
        Ok(Self::with_executor(config, executor))
    }
}

impl<E: HttpExecutor> RemoteClient<E> {
    pub fn with_executor(config: ClientConfig, executor: E) -> Self {
        Self {
            config: Arc::new(config),
            executor: Arc::new(executor),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A proxy for the resource `manifest` describes.
    pub fn proxy(&self, manifest: &ResourceManifest) -> Result<RemoteProxy<E>, RemoteError> {
        RemoteProxy::new(manifest, Arc::clone(&self.config), Arc::clone(&self.executor))
    }

    /// Proxies for every manifest, keyed by resource name.
    pub fn proxies(
        &self,
        manifests: &[ResourceManifest],
    ) -> Result<BTreeMap<String, RemoteProxy<E>>, RemoteError> {
        manifests
            .iter()
            .map(|manifest| Ok((manifest.name.clone(), self.proxy(manifest)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::mock::MockExecutor;
    use isoresource_core::{ManifestAction, Method, PatternError};
    use serde_json::json;

    fn manifest() -> ResourceManifest {
        let update = ActionDescriptor::new("update", "/$id", Method::PATCH);
        ResourceManifest {
            name: "tasks".to_string(),
            path: "/tasks".to_string(),
            actions: vec![
                ManifestAction {
                    descriptor: ActionDescriptor::new("index", "/", Method::GET),
                    schema: Schema::object([
                        ("page", Schema::integer().optional()),
                        ("tags", Schema::array(Schema::string()).optional()),
                    ]),
                },
                ManifestAction {
                    descriptor: update,
                    schema: Schema::object([("id", Schema::integer()), ("title", Schema::string().min(1.0))]),
                },
                ManifestAction {
                    descriptor: ActionDescriptor::new("stats", "/stats", Method::GET),
                    schema: Schema::blank(),
                },
            ],
        }
    }

    fn proxy(executor: MockExecutor) -> RemoteProxy<MockExecutor> {
        let config = ClientConfig::new("http://localhost:3000")
            .unwrap()
            .with_header("Authorization", "Bearer t");
        RemoteClient::with_executor(config, executor).proxy(&manifest()).unwrap()
    }

    #[test]
    fn query_verbs_flatten_input() {
        let proxy = proxy(MockExecutor::new());
        let input = Value::object([
            ("page", Value::from(2i64)),
            ("tags", Value::from(vec!["a", "b"])),
        ]);
        let request = proxy.prepare("index", Some(input)).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "http://localhost:3000/tasks");
        assert_eq!(request.query_param("page"), Some("2"));
        assert_eq!(
            request.query.iter().filter(|(k, _)| k == "tags[]").count(),
            2
        );
        assert!(request.body.is_none());
        assert_eq!(request.header("x-requested-with"), Some("XMLHttpRequest"));
        assert_eq!(request.header("authorization"), Some("Bearer t"));
    }

    #[test]
    fn path_params_leave_the_body() {
        let proxy = proxy(MockExecutor::new());
        let input = Value::object([("id", Value::from(7i64)), ("title", Value::from("ship"))]);
        let request = proxy.prepare("update", Some(input)).unwrap();
        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.url, "http://localhost:3000/tasks/7");
        assert_eq!(request.body, Some(json!({ "title": "ship" })));
    }

    #[test]
    fn invalid_input_is_rejected_locally() {
        let executor = MockExecutor::new();
        let proxy = proxy(executor.clone());
        let input = Value::object([("id", Value::from(7i64)), ("title", Value::from(""))]);
        let error = proxy.prepare("update", Some(input)).unwrap_err();
        assert_eq!(error.validation().unwrap().issues[0].dotted_path(), "title");
        assert!(executor.recorded_requests().is_empty());
    }

    #[test]
    fn missing_path_param() {
        let proxy = proxy(MockExecutor::new());
        let error = proxy
            .prepare("update", Some(Value::object([("title", Value::from("x"))])))
            .unwrap_err();
        assert!(matches!(
            error,
            RemoteError::MissingPathParam(PatternError::MissingParam { ref name }) if name == "id"
        ));
    }

    #[test]
    fn blank_actions_send_nothing() {
        let proxy = proxy(MockExecutor::new());
        let request = proxy.prepare("stats", Some(Value::from("ignored"))).unwrap();
        assert_eq!(request.url, "http://localhost:3000/tasks/stats");
        assert!(request.query.is_empty());
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn unwraps_success_data() {
        let executor = MockExecutor::new()
            .with_response("/tasks/stats", MockExecutor::success_response(json!({ "open": 3 })));
        let output = proxy(executor.clone()).call("stats", None).await.unwrap();
        assert_eq!(output.get("open"), Some(&Value::Integer(3)));
        assert_eq!(executor.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn success_without_data_is_undefined() {
        let executor = MockExecutor::new()
            .with_default_response(HttpResponse::json(200, &json!({ "status": "success" })));
        let output = proxy(executor).call("stats", None).await.unwrap();
        assert!(output.is_undefined());
    }

    #[tokio::test]
    async fn reconstructs_validation_errors() {
        let body = json!({
            "status": "error",
            "errors": [{ "code": "custom", "path": ["title"], "message": "taken" }],
            "message": "title: taken",
        });
        let executor = MockExecutor::new().with_default_response(HttpResponse::json(422, &body));
        let input = Value::object([("id", Value::from(1i64)), ("title", Value::from("dup"))]);
        let error = proxy(executor).call("update", Some(input)).await.unwrap_err();
        let validation = error.validation().unwrap();
        assert_eq!(validation.issues_at("title")[0].message, "taken");
    }

    #[tokio::test]
    async fn maps_statuses_to_error_kinds() {
        let error = proxy(MockExecutor::new()).call("stats", None).await.unwrap_err();
        assert!(matches!(error, RemoteError::Client { status: 404, ref message } if message == "Not Found"));

        let executor = MockExecutor::new().with_default_response(MockExecutor::error_response(500, "boom"));
        let error = proxy(executor).call("stats", None).await.unwrap_err();
        assert_eq!(error.status(), Some(500));
        assert!(matches!(error, RemoteError::Server { .. }));
    }

    #[tokio::test]
    async fn non_envelope_success_is_a_protocol_error() {
        let executor = MockExecutor::new().with_default_response(HttpResponse::new(200, "<html></html>"));
        let error = proxy(executor).call("stats", None).await.unwrap_err();
        assert!(matches!(error, RemoteError::Protocol(_)));
    }

    #[tokio::test]
    async fn transport_and_unknown_action_errors() {
        let error = proxy(MockExecutor::new().fail_with("connection refused"))
            .call("stats", None)
            .await
            .unwrap_err();
        assert!(matches!(error, RemoteError::Transport(ref m) if m == "connection refused"));

        let error = proxy(MockExecutor::new()).call("archive", None).await.unwrap_err();
        assert!(matches!(error, RemoteError::UnknownAction { .. }));
    }
}
