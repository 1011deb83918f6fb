//! Resource registration and the build phase.
//!
//! Registration only records what to mount: each [`RouterBuilder::resources`]
//! call checks names and paths, then queues a runner that loads the resource
//! module later. [`RouterBuilder::build`] awaits the runners in registration
//! order and freezes the result into a [`RouteTable`].
//!
//! The builder owns the shared arena ([`RouterCore`]); [`Scope`]s are prefix
//! views borrowing it, so every resource in a tree shares one name space.
//!
//! # Example
//!
//! ```rust
//! use isoresource_core::{ActionDescriptor, BoxError, InputDescriptor, Method, Value};
//! use isoresource_server::{ConfigurationError, Resource, ResourceRouteConfig, RouterBuilder};
//!
//! # async fn demo() -> Result<(), ConfigurationError> {
//! let tasks = Resource::<()>::new().method("index", |_input, _options| async {
//!     Ok::<_, BoxError>(Value::array())
//! });
//!
//! let mut router = RouterBuilder::<()>::new();
//! router
//!     .default_input("index", InputDescriptor::blank())
//!     .mount(
//!         "/tasks",
//!         ResourceRouteConfig::new("tasks").action(ActionDescriptor::new("index", "/", Method::GET)),
//!         tasks,
//!     )?;
//! let table = router.build().await?;
//! assert!(table.route("tasks", "index").is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use isoresource_core::{ActionDescriptor, InputDescriptor, PathPattern};

use crate::adapter::AdapterEntry;
use crate::error::{ConfigurationError, LoadError};
use crate::resource::{Resource, ResourceModule};
use crate::table::{Route, RouteTable};

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// How one resource is exposed: its unique name, its actions and their
/// input descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRouteConfig {
    pub name: String,
    pub actions: Vec<ActionDescriptor>,
    /// Per-action input; actions missing here inherit the registry default.
    pub inputs: BTreeMap<String, InputDescriptor>,
}

impl ResourceRouteConfig {
    /// A resource with no actions yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            inputs: BTreeMap::new(),
        }
    }

    /// A resource with the standard CRUD actions.
    pub fn crud(name: impl Into<String>) -> Self {
        Self {
            actions: ActionDescriptor::crud(),
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn action(mut self, descriptor: ActionDescriptor) -> Self {
        self.actions.push(descriptor);
        self
    }

    #[must_use]
    pub fn input(mut self, action: impl Into<String>, descriptor: InputDescriptor) -> Self {
        self.inputs.insert(action.into(), descriptor);
        self
    }
}

/// A resource after its module was loaded and its routes resolved.
pub(crate) struct MountedResource<O> {
    name: String,
    path: PathPattern,
    routes: Vec<Route<O>>,
}

type Defaults = Arc<BTreeMap<String, InputDescriptor>>;

type Runner<O> =
    Box<dyn FnOnce(Defaults) -> BoxFuture<'static, Result<MountedResource<O>, ConfigurationError>> + Send>;

/// The arena shared by a router tree during registration.
pub struct RouterCore<O> {
    runners: Vec<Runner<O>>,
    /// Resource name to mount path, for duplicate detection.
    names: BTreeMap<String, String>,
    defaults: BTreeMap<String, InputDescriptor>,
}

impl<O> Default for RouterCore<O> {
    fn default() -> Self {
        Self {
            runners: Vec::new(),
            names: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }
}

impl<O: Send + 'static> RouterCore<O> {
    fn register<F, Fut>(
        &mut self,
        prefix: &PathPattern,
        path: &str,
        config: ResourceRouteConfig,
        loader: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ResourceModule<O>, LoadError>> + Send + 'static,
    {
        let mount = prefix.join(&parse_path(path)?);

        let mut seen = BTreeSet::new();
        for descriptor in &config.actions {
            if !seen.insert(descriptor.action.as_str()) {
                return Err(ConfigurationError::DuplicateAction {
                    resource: config.name.clone(),
                    action: descriptor.action.clone(),
                });
            }
            parse_path(&descriptor.path)?;
        }

        let mount_path = mount.to_string();
        if let Some(previous_path) = self.names.get(&config.name) {
            return Err(ConfigurationError::DuplicateResource {
                name: config.name,
                path: mount_path,
                previous_path: previous_path.clone(),
            });
        }
        self.names.insert(config.name.clone(), mount_path.clone());

        tracing::debug!(
            target: REGISTRY_TARGET,
            resource = %config.name,
            path = %mount_path,
            actions = config.actions.len(),
            "queued resource"
        );
        self.runners.push(Box::new(move |defaults: Defaults| {
            async move {
                let loaded = loader().await;
                build_resource(config, mount, loaded, &defaults)
            }
            .boxed()
        }));
        Ok(())
    }
}

/// The top-level router. Owns the arena until [`RouterBuilder::build`].
pub struct RouterBuilder<O> {
    core: RouterCore<O>,
}

impl<O> Default for RouterBuilder<O> {
    fn default() -> Self {
        Self {
            core: RouterCore::default(),
        }
    }
}

impl<O: Send + 'static> RouterBuilder<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry-wide input descriptor for every action named `action`.
    pub fn default_input(&mut self, action: impl Into<String>, descriptor: InputDescriptor) -> &mut Self {
        self.core.defaults.insert(action.into(), descriptor);
        self
    }

    /// A view registering resources under `prefix`.
    pub fn scope(&mut self, prefix: &str) -> Result<Scope<'_, O>, ConfigurationError> {
        Ok(Scope {
            prefix: parse_path(prefix)?,
            core: &mut self.core,
        })
    }

    /// Queue a resource whose module is produced by `loader` at build time.
    ///
    /// Names and paths are checked now; a duplicate name fails here, naming
    /// both mount paths.
    pub fn resources<F, Fut>(
        &mut self,
        path: &str,
        config: ResourceRouteConfig,
        loader: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ResourceModule<O>, LoadError>> + Send + 'static,
    {
        self.core.register(&PathPattern::default(), path, config, loader)?;
        Ok(self)
    }

    /// Queue an already constructed resource.
    pub fn mount(
        &mut self,
        path: &str,
        config: ResourceRouteConfig,
        module: impl Into<ResourceModule<O>>,
    ) -> Result<&mut Self, ConfigurationError> {
        let module = module.into();
        self.resources(path, config, move || future::ready(Ok(module)))
    }

    /// Load every queued resource, in registration order, and freeze the table.
    pub async fn build(self) -> Result<RouteTable<O>, ConfigurationError> {
        let RouterCore {
            runners, defaults, ..
        } = self.core;
        let defaults = Arc::new(defaults);

        let mut table = RouteTable::default();
        for runner in runners {
            let mounted = runner(Arc::clone(&defaults)).await?;
            tracing::debug!(
                target: REGISTRY_TARGET,
                resource = %mounted.name,
                path = %mounted.path,
                routes = mounted.routes.len(),
                "mounted resource"
            );
            table.insert(mounted.name, mounted.path, mounted.routes);
        }
        tracing::info!(target: REGISTRY_TARGET, routes = table.len(), "route table built");
        Ok(table)
    }
}

/// A prefix view into a router's arena.
pub struct Scope<'r, O> {
    core: &'r mut RouterCore<O>,
    prefix: PathPattern,
}

impl<O: Send + 'static> Scope<'_, O> {
    pub fn prefix(&self) -> &PathPattern {
        &self.prefix
    }

    /// A nested view; prefixes accumulate.
    pub fn scope(&mut self, prefix: &str) -> Result<Scope<'_, O>, ConfigurationError> {
        Ok(Scope {
            prefix: self.prefix.join(&parse_path(prefix)?),
            core: &mut *self.core,
        })
    }

    pub fn resources<F, Fut>(
        &mut self,
        path: &str,
        config: ResourceRouteConfig,
        loader: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ResourceModule<O>, LoadError>> + Send + 'static,
    {
        self.core.register(&self.prefix, path, config, loader)?;
        Ok(self)
    }

    pub fn mount(
        &mut self,
        path: &str,
        config: ResourceRouteConfig,
        module: impl Into<ResourceModule<O>>,
    ) -> Result<&mut Self, ConfigurationError> {
        let module = module.into();
        self.resources(path, config, move || future::ready(Ok(module)))
    }
}

fn parse_path(path: &str) -> Result<PathPattern, ConfigurationError> {
    PathPattern::parse(path).map_err(|source| ConfigurationError::InvalidPath {
        path: path.to_string(),
        source,
    })
}

/// Resolve every action of one loaded resource into a route.
fn build_resource<O: Send + 'static>(
    config: ResourceRouteConfig,
    mount: PathPattern,
    loaded: Result<ResourceModule<O>, LoadError>,
    defaults: &BTreeMap<String, InputDescriptor>,
) -> Result<MountedResource<O>, ConfigurationError> {
    let ResourceRouteConfig { name, actions, inputs } = config;

    let ResourceModule { resource, mut adapter } = match loaded {
        Ok(module) => module,
        Err(LoadError::NotFound { what }) if actions.iter().all(|a| a.page) => {
            tracing::warn!(
                target: REGISTRY_TARGET,
                resource = %name,
                %what,
                "resource module not found, serving its pages only"
            );
            ResourceModule::new(Resource::new())
        }
        Err(source) => return Err(ConfigurationError::Load { resource: name, source }),
    };

    let mut routes = Vec::with_capacity(actions.len());
    for descriptor in actions {
        let action = descriptor.action.clone();
        let pattern = mount.join(&parse_path(&descriptor.path)?);
        let entry = adapter.take(&action);
        let method = resource.get(&action).cloned();

        let input = if entry.as_ref().is_some_and(AdapterEntry::bypasses_validation) {
            InputDescriptor::blank()
        } else if method.is_some() {
            inputs
                .get(&action)
                .or_else(|| defaults.get(&action))
                .cloned()
                .ok_or_else(|| ConfigurationError::MissingSchema {
                    resource: name.clone(),
                    action: action.clone(),
                })?
        } else if descriptor.page {
            inputs.get(&action).cloned().unwrap_or_else(InputDescriptor::blank)
        } else {
            return Err(ConfigurationError::DanglingRoute {
                resource: name,
                action,
                path: pattern.to_string(),
            });
        };

        routes.push(Route {
            resource: name.clone(),
            descriptor,
            pattern,
            input,
            method,
            adapter: entry,
        });
    }

    for action in adapter.remaining() {
        tracing::warn!(target: REGISTRY_TARGET, resource = %name, action, "adapter entry has no matching action");
    }
    for action in resource.actions().filter(|a| !routes.iter().any(|r| r.action() == *a)) {
        tracing::debug!(target: REGISTRY_TARGET, resource = %name, action, "resource method is not routed");
    }

    Ok(MountedResource {
        name,
        path: mount,
        routes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{handler, Adapter};
    use crate::response::Response;
    use http::StatusCode;
    use isoresource_core::{BoxError, Method, Schema, Value};

    fn list() -> Resource<()> {
        Resource::new().method("index", |_input, _options| async { Ok::<_, BoxError>(Value::array()) })
    }

    fn index_config(name: &str) -> ResourceRouteConfig {
        ResourceRouteConfig::new(name)
            .action(ActionDescriptor::new("index", "/", Method::GET))
            .input("index", InputDescriptor::blank())
    }

    #[tokio::test]
    async fn duplicate_names_fail_at_registration() {
        let mut router = RouterBuilder::<()>::new();
        router.mount("/tasks", index_config("tasks"), list()).unwrap();
        let error = router
            .scope("/admin")
            .unwrap()
            .mount("/tasks", index_config("tasks"), list())
            .err()
            .unwrap();
        match error {
            ConfigurationError::DuplicateResource {
                name,
                path,
                previous_path,
            } => {
                assert_eq!(name, "tasks");
                assert_eq!(path, "/admin/tasks");
                assert_eq!(previous_path, "/tasks");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn duplicate_actions_are_rejected() {
        let config = index_config("tasks").action(ActionDescriptor::new("index", "/all", Method::GET));
        let mut router = RouterBuilder::<()>::new();
        assert!(matches!(
            router.mount("/tasks", config, list()),
            Err(ConfigurationError::DuplicateAction { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_paths_are_rejected() {
        let mut router = RouterBuilder::<()>::new();
        assert!(matches!(
            router.mount("/tasks/$1d", index_config("tasks"), list()),
            Err(ConfigurationError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn scopes_nest_prefixes() {
        let mut router = RouterBuilder::<()>::new();
        {
            let mut api = router.scope("/api").unwrap();
            let mut v1 = api.scope("/v1").unwrap();
            assert_eq!(v1.prefix().to_string(), "/api/v1");
            v1.mount("/tasks", index_config("tasks"), list()).unwrap();
        }
        let table = router.build().await.unwrap();
        assert!(table.find(Method::GET, "/api/v1/tasks").is_some());
        assert_eq!(table.manifest("tasks").unwrap().path, "/api/v1/tasks");
    }

    #[tokio::test]
    async fn missing_schema_is_a_configuration_error() {
        let config = ResourceRouteConfig::new("tasks").action(ActionDescriptor::new("index", "/", Method::GET));
        let mut router = RouterBuilder::<()>::new();
        router.mount("/tasks", config, list()).unwrap();
        assert!(matches!(
            router.build().await,
            Err(ConfigurationError::MissingSchema { action, .. }) if action == "index"
        ));
    }

    #[tokio::test]
    async fn registry_defaults_supply_schemas() {
        let config = ResourceRouteConfig::new("tasks").action(ActionDescriptor::new("index", "/", Method::GET));
        let mut router = RouterBuilder::<()>::new();
        router
            .default_input("index", InputDescriptor::new(Schema::object([("page", Schema::integer().optional())])))
            .mount("/tasks", config, list())
            .unwrap();
        let table = router.build().await.unwrap();
        let route = table.route("tasks", "index").unwrap();
        assert!(route.schema().field("page").is_some());
    }

    #[tokio::test]
    async fn dangling_routes_fail_the_build() {
        let config = index_config("tasks").action(ActionDescriptor::new("archive", "/archive", Method::POST));
        let mut router = RouterBuilder::<()>::new();
        router.mount("/tasks", config, list()).unwrap();
        match router.build().await {
            Err(ConfigurationError::DanglingRoute { action, path, .. }) => {
                assert_eq!(action, "archive");
                assert_eq!(path, "/tasks/archive");
            }
            other => panic!("expected a dangling route, got {:?}", other.map(|t| t.len())),
        }
    }

    #[tokio::test]
    async fn page_only_resources_tolerate_missing_modules() {
        let config = ResourceRouteConfig::new("about").action(ActionDescriptor::new("show", "/", Method::GET).page());
        let mut router = RouterBuilder::<()>::new();
        router
            .resources("/about", config, || async { Err(LoadError::not_found("about")) })
            .unwrap();
        let table = router.build().await.unwrap();
        let route = table.route("about", "show").unwrap();
        assert!(!route.has_method());
        assert!(route.schema().is_blank());
    }

    #[tokio::test]
    async fn missing_modules_fail_otherwise() {
        let mut router = RouterBuilder::<()>::new();
        router
            .resources("/tasks", index_config("tasks"), || async { Err(LoadError::not_found("tasks")) })
            .unwrap();
        assert!(matches!(
            router.build().await,
            Err(ConfigurationError::Load {
                source: LoadError::NotFound { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn handlers_bypass_schema_resolution() {
        let config = ResourceRouteConfig::new("health").action(ActionDescriptor::new("check", "/", Method::GET));
        let module = ResourceModule::new(Resource::<()>::new()).with_adapter(
            Adapter::new().on("check", handler(|_request| async {
                Ok::<_, BoxError>(Response::text(StatusCode::OK, "ok"))
            })),
        );
        let mut router = RouterBuilder::<()>::new();
        router.mount("/health", config, module).unwrap();
        let table = router.build().await.unwrap();
        let route = table.route("health", "check").unwrap();
        assert!(route.adapter().is_some());
        assert!(route.schema().is_blank());
    }

    #[tokio::test]
    async fn loaders_run_in_registration_order() {
        let mut router = RouterBuilder::<()>::new();
        router
            .resources("/b", index_config("b"), || async { Ok(ResourceModule::new(list())) })
            .unwrap()
            .resources("/a", index_config("a"), || async { Ok(ResourceModule::new(list())) })
            .unwrap();
        let table = router.build().await.unwrap();
        let order: Vec<_> = table.routes().map(|r| r.resource.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }
}
