//! Action and input descriptors.
//!
//! An `ActionDescriptor` binds one named operation of a resource to a path
//! pattern and HTTP verbs. An `InputDescriptor` says how that action's input
//! is validated and which request sources feed it. A `ResourceManifest` is the
//! serialisable union of both for a mounted resource; the client builds its
//! proxies from it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schema::Schema;

/// HTTP method for actions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl Method {
    /// Whether input travels in the query string rather than a body.
    pub fn uses_query(self) -> bool {
        matches!(self, Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
            Method::PATCH => http::Method::PATCH,
            Method::HEAD => http::Method::HEAD,
            Method::OPTIONS => http::Method::OPTIONS,
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = String;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        match *method {
            http::Method::GET => Ok(Method::GET),
            http::Method::POST => Ok(Method::POST),
            http::Method::PUT => Ok(Method::PUT),
            http::Method::DELETE => Ok(Method::DELETE),
            http::Method::PATCH => Ok(Method::PATCH),
            http::Method::HEAD => Ok(Method::HEAD),
            http::Method::OPTIONS => Ok(Method::OPTIONS),
            ref other => Err(other.to_string()),
        }
    }
}

/// Preferred response representation of an action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Json,
    Html,
}

/// A request source feeding action input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Body,
    Query,
    Params,
    Files,
}

impl Source {
    /// Sources used when an input descriptor does not list any.
    pub fn defaults_for(method: Method) -> Vec<Source> {
        if method.uses_query() {
            vec![Source::Query, Source::Params]
        } else {
            vec![Source::Query, Source::Body, Source::Files, Source::Params]
        }
    }
}

/// One named operation bound to a path and HTTP verb(s).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDescriptor {
    pub action: String,
    /// Pattern relative to the resource mount, with `$name` placeholders.
    pub path: String,
    #[serde(rename = "method", with = "one_or_many")]
    pub methods: Vec<Method>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    /// Served by a page render; may exist without a resource method.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub page: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hydrate: bool,
}

impl ActionDescriptor {
    pub fn new(action: impl Into<String>, path: impl Into<String>, method: Method) -> Self {
        Self {
            action: action.into(),
            path: path.into(),
            methods: vec![method],
            response_type: None,
            page: false,
            hydrate: false,
        }
    }

    /// Accept an additional verb.
    #[must_use]
    pub fn also(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    #[must_use]
    pub fn page(mut self) -> Self {
        self.page = true;
        self
    }

    #[must_use]
    pub fn hydrate(mut self) -> Self {
        self.hydrate = true;
        self
    }

    #[must_use]
    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// The verb a client uses when calling this action.
    pub fn primary_method(&self) -> Method {
        self.methods.first().copied().unwrap_or_default()
    }

    /// The conventional create/read/update/delete action set.
    ///
    /// | action    | verb         | path          |
    /// |-----------|--------------|---------------|
    /// | `index`   | GET          | `/`           |
    /// | `new`     | GET (page)   | `/new`        |
    /// | `create`  | POST         | `/`           |
    /// | `show`    | GET          | `/$id`        |
    /// | `edit`    | GET (page)   | `/$id/edit`   |
    /// | `update`  | PATCH, PUT   | `/$id`        |
    /// | `destroy` | DELETE       | `/$id`        |
    pub fn crud() -> Vec<ActionDescriptor> {
        vec![
            ActionDescriptor::new("index", "/", Method::GET),
            ActionDescriptor::new("new", "/new", Method::GET).page(),
            ActionDescriptor::new("create", "/", Method::POST),
            ActionDescriptor::new("show", "/$id", Method::GET),
            ActionDescriptor::new("edit", "/$id/edit", Method::GET).page(),
            ActionDescriptor::new("update", "/$id", Method::PATCH).also(Method::PUT),
            ActionDescriptor::new("destroy", "/$id", Method::DELETE),
        ]
    }
}

/// How an action's input is validated and gathered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputDescriptor {
    /// `Schema::Blank` means no validation and blank input.
    pub schema: Schema,
    /// Ordered sources; later sources override earlier ones on key collisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl InputDescriptor {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            sources: None,
        }
    }

    pub fn blank() -> Self {
        Self::new(Schema::Blank)
    }

    #[must_use]
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.sources = Some(sources.into_iter().collect());
        self
    }

    /// The configured sources, or the defaults for `method`.
    pub fn sources_for(&self, method: Method) -> Vec<Source> {
        self.sources
            .clone()
            .unwrap_or_else(|| Source::defaults_for(method))
    }
}

/// One action of a mounted resource, with its resolved schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestAction {
    #[serde(flatten)]
    pub descriptor: ActionDescriptor,
    pub schema: Schema,
}

/// Everything a remote proxy needs to call a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceManifest {
    pub name: String,
    /// Mount path of the resource (pattern syntax).
    pub path: String,
    pub actions: Vec<ManifestAction>,
}

impl ResourceManifest {
    pub fn action(&self, name: &str) -> Option<&ManifestAction> {
        self.actions.iter().find(|a| a.descriptor.action == name)
    }
}

mod one_or_many {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Method),
        Many(Vec<Method>),
    }

    pub fn serialize<S: Serializer>(methods: &[Method], serializer: S) -> Result<S::Ok, S::Error> {
        match methods {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Method>, D::Error> {
        match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(method) => Ok(vec![method]),
            OneOrMany::Many(methods) if !methods.is_empty() => Ok(methods),
            OneOrMany::Many(_) => Err(serde::de::Error::custom("at least one method is required")),
        }
    }
}
