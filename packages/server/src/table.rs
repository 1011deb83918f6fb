//! The frozen route table produced by [`RouterBuilder::build`](crate::RouterBuilder::build).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use isoresource_core::{
    ActionDescriptor, InputDescriptor, ManifestAction, Method, ParamStyle, PathPattern, PatternSegment,
    ResourceManifest, ResponseType, Schema,
};

use crate::adapter::AdapterEntry;
use crate::resource::ResourceMethod;

/// One action bound to a concrete path.
pub struct Route<O> {
    pub resource: String,
    pub descriptor: ActionDescriptor,
    /// Mount path joined with the action path.
    pub pattern: PathPattern,
    /// Resolved input descriptor; blank for bypassing adapters and bare pages.
    pub input: InputDescriptor,
    pub(crate) method: Option<ResourceMethod<O>>,
    pub(crate) adapter: Option<AdapterEntry<O>>,
}

impl<O> Route<O> {
    pub fn action(&self) -> &str {
        &self.descriptor.action
    }

    pub fn schema(&self) -> &Schema {
        &self.input.schema
    }

    pub fn has_method(&self) -> bool {
        self.method.is_some()
    }

    pub fn adapter(&self) -> Option<&AdapterEntry<O>> {
        self.adapter.as_ref()
    }

    /// Whether a non-JSON caller gets a rendered page by default.
    pub fn renders_page(&self) -> bool {
        match self.descriptor.response_type {
            Some(ResponseType::Json) => false,
            Some(ResponseType::Html) => true,
            None => self.descriptor.page,
        }
    }

    fn accepts(&self, method: Method) -> bool {
        let methods = &self.descriptor.methods;
        methods.contains(&method) || (method == Method::HEAD && methods.contains(&Method::GET))
    }

    /// Literal segments outrank parameters, position by position.
    fn specificity(&self) -> Vec<bool> {
        self.pattern
            .segments()
            .iter()
            .map(|segment| matches!(segment, PatternSegment::Literal(_)))
            .collect()
    }
}

impl<O> fmt::Debug for Route<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("resource", &self.resource)
            .field("action", &self.descriptor.action)
            .field("methods", &self.descriptor.methods)
            .field("pattern", &self.pattern.to_string())
            .field("has_method", &self.method.is_some())
            .field("adapter", &self.adapter.as_ref().map(AdapterEntry::kind))
            .finish()
    }
}

/// A matched route with its decoded path parameters.
pub struct RouteMatch<O> {
    pub route: Arc<Route<O>>,
    pub params: BTreeMap<String, String>,
}

/// Where a resource is mounted and which routes belong to it.
#[derive(Debug, Clone)]
pub(crate) struct Mount {
    pub(crate) path: PathPattern,
    pub(crate) routes: Vec<usize>,
}

/// Immutable once built; share it behind an `Arc`.
pub struct RouteTable<O> {
    routes: Vec<Arc<Route<O>>>,
    mounts: BTreeMap<String, Mount>,
}

impl<O> Default for RouteTable<O> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            mounts: BTreeMap::new(),
        }
    }
}

impl<O> fmt::Debug for RouteTable<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .finish()
    }
}

impl<O> RouteTable<O> {
    pub(crate) fn insert(&mut self, name: String, path: PathPattern, routes: Vec<Route<O>>) {
        let start = self.routes.len();
        self.routes.extend(routes.into_iter().map(Arc::new));
        let indices = (start..self.routes.len()).collect();
        self.mounts.insert(name, Mount { path, routes: indices });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route<O>>> {
        self.routes.iter()
    }

    /// Names of the mounted resources.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(String::as_str)
    }

    /// The route of `resource.action`.
    pub fn route(&self, resource: &str, action: &str) -> Option<&Arc<Route<O>>> {
        self.resource_routes(resource)
            .find(|route| route.descriptor.action == action)
    }

    pub(crate) fn resource_routes<'a>(&'a self, resource: &str) -> impl Iterator<Item = &'a Arc<Route<O>>> + 'a {
        self.mounts
            .get(resource)
            .into_iter()
            .flat_map(|mount| mount.routes.iter())
            .filter_map(|index| self.routes.get(*index))
    }

    /// Match a request. The most specific pattern wins; among equally
    /// specific patterns the first registered one does.
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch<O>> {
        let mut best: Option<(Vec<bool>, RouteMatch<O>)> = None;
        for route in self.routes.iter().filter(|route| route.accepts(method)) {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            let rank = route.specificity();
            if best.as_ref().map_or(true, |(current, _)| rank > *current) {
                best = Some((
                    rank,
                    RouteMatch {
                        route: Arc::clone(route),
                        params,
                    },
                ));
            }
        }
        best.map(|(_, found)| found)
    }

    /// Everything a remote proxy needs to call `resource`.
    pub fn manifest(&self, resource: &str) -> Option<ResourceManifest> {
        let mount = self.mounts.get(resource)?;
        let actions = self
            .resource_routes(resource)
            .map(|route| ManifestAction {
                descriptor: route.descriptor.clone(),
                schema: route.input.schema.clone(),
            })
            .collect();
        Some(ResourceManifest {
            name: resource.to_string(),
            path: mount.path.to_string(),
            actions,
        })
    }

    pub fn manifests(&self) -> Vec<ResourceManifest> {
        self.mounts
            .keys()
            .filter_map(|name| self.manifest(name))
            .collect()
    }

    /// `(verb, path)` pairs in the host framework's placeholder syntax.
    pub fn framework_routes(&self, style: ParamStyle) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .flat_map(|route| {
                let path = route.pattern.to_framework(style);
                route
                    .descriptor
                    .methods
                    .iter()
                    .map(move |method| (*method, path.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(resource: &str, descriptor: ActionDescriptor, mount: &str) -> Route<()> {
        let pattern = PathPattern::parse(mount)
            .unwrap()
            .join(&PathPattern::parse(&descriptor.path).unwrap());
        Route {
            resource: resource.to_string(),
            descriptor,
            pattern,
            input: InputDescriptor::blank(),
            method: None,
            adapter: None,
        }
    }

    fn crud_table() -> RouteTable<()> {
        let mut table = RouteTable::default();
        let routes = ActionDescriptor::crud()
            .into_iter()
            .map(|descriptor| route("tasks", descriptor, "/tasks"))
            .collect();
        table.insert("tasks".to_string(), PathPattern::parse("/tasks").unwrap(), routes);
        table
    }

    #[test]
    fn literal_segments_win() {
        let table = crud_table();
        let found = table.find(Method::GET, "/tasks/new").unwrap();
        assert_eq!(found.route.action(), "new");

        let found = table.find(Method::GET, "/tasks/42").unwrap();
        assert_eq!(found.route.action(), "show");
        assert_eq!(found.params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn verbs_select_actions() {
        let table = crud_table();
        assert_eq!(table.find(Method::PUT, "/tasks/1").unwrap().route.action(), "update");
        assert_eq!(table.find(Method::DELETE, "/tasks/1").unwrap().route.action(), "destroy");
        assert_eq!(table.find(Method::HEAD, "/tasks").unwrap().route.action(), "index");
        assert!(table.find(Method::POST, "/tasks/1").is_none());
        assert!(table.find(Method::GET, "/projects").is_none());
    }

    #[test]
    fn manifest_lists_actions() {
        let table = crud_table();
        let manifest = table.manifest("tasks").unwrap();
        assert_eq!(manifest.path, "/tasks");
        assert_eq!(manifest.actions.len(), 7);
        assert_eq!(manifest.action("edit").unwrap().descriptor.path, "/$id/edit");
        assert!(table.manifest("nope").is_none());
    }

    #[test]
    fn framework_paths() {
        let table = crud_table();
        let routes = table.framework_routes(ParamStyle::Colon);
        assert!(routes.contains(&(Method::GET, "/tasks/:id/edit".to_string())));
        assert!(routes.contains(&(Method::PUT, "/tasks/:id".to_string())));
        assert_eq!(routes.len(), 8);
    }
}
