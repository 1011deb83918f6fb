//! The request abstraction the dispatcher consumes.
//!
//! Host HTTP frameworks convert their own request type into a [`Request`],
//! decoding multipart bodies into text fields and already-saved files first.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use isoresource_core::{FileHandle, Method};

use crate::response::Response;

/// `X-Requested-With`, sent by script-driven calls.
pub const REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// An inbound request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: String,
    pub headers: HeaderMap,
    /// Route parameters, filled when the route is matched.
    pub params: BTreeMap<String, String>,
    pub body: Bytes,
    /// Text fields of a decoded multipart body.
    pub form: Vec<(String, String)>,
    /// File fields of a decoded multipart body.
    pub files: Vec<(String, FileHandle)>,
}

impl Request {
    /// Build a request; a `?query` suffix on `target` is split off.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self {
            method,
            path: path.to_string(),
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// JSON body with a matching content type.
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Bytes::from(body.to_string());
        self
    }

    /// URL-encoded form body.
    pub fn with_form<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.body = Bytes::from(encoded);
        self
    }

    /// Raw binary body.
    pub fn with_octets(mut self, body: impl Into<Bytes>) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        self.body = body.into();
        self
    }

    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Media type of the body, lowercased, parameters stripped.
    pub fn content_type(&self) -> Option<String> {
        self.header(CONTENT_TYPE)
            .and_then(|v| v.split(';').next())
            .map(|essence| essence.trim().to_ascii_lowercase())
            .filter(|essence| !essence.is_empty())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Whether the caller negotiates a JSON envelope rather than a page.
    pub fn wants_json(&self) -> bool {
        let accepts_json = self
            .header(ACCEPT)
            .is_some_and(|accept| accept.contains("application/json"));
        let scripted = self
            .header(REQUESTED_WITH)
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"));
        accepts_json || scripted
    }
}

impl TryFrom<http::Request<Bytes>> for Request {
    type Error = String;

    fn try_from(request: http::Request<Bytes>) -> Result<Self, Self::Error> {
        let (parts, body) = request.into_parts();
        let method = Method::try_from(&parts.method)?;
        Ok(Self {
            method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts.headers,
            body,
            ..Default::default()
        })
    }
}

/// A request in flight, plus the response slot hooks may fill.
#[derive(Debug)]
pub struct RequestContext {
    pub request: Request,
    response: Option<Response>,
}

impl RequestContext {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: None,
        }
    }

    /// Produce the response now. A success hook that then returns
    /// `SuccessOutcome::Keep` leaves it in place.
    pub fn respond(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}
