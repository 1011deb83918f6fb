//! Wire-level responses and the JSON envelope.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};
use isoresource_core::{value_to_json, ValidationError, Value};
use serde_json::json;

/// A finished response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self::new(status, "application/json", body.to_string())
    }

    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, "text/html; charset=utf-8", body.into())
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain; charset=utf-8", body.into())
    }

    /// `303 See Other` to `location`.
    pub fn redirect(location: &str) -> Result<Self, http::header::InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::try_from(location)?);
        Ok(Self {
            status: StatusCode::SEE_OTHER,
            headers,
            body: Bytes::new(),
        })
    }

    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn body_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// The JSON envelope shared by server and client.
pub mod envelope {
    use super::*;

    /// `{ "status": "success", "data"?: ... }`
    pub fn success(data: Value) -> serde_json::Value {
        if data.is_undefined() {
            json!({ "status": "success" })
        } else {
            json!({ "status": "success", "data": value_to_json(data) })
        }
    }

    /// `{ "status": "error", "errors": [...], "message": ... }`
    pub fn invalid(error: &ValidationError) -> serde_json::Value {
        json!({
            "status": "error",
            "errors": error.issues,
            "message": error.summary(),
        })
    }

    /// `{ "status": "fatal", "message"?: ... }`
    pub fn fatal(message: Option<&str>) -> serde_json::Value {
        match message {
            Some(message) => json!({ "status": "fatal", "message": message }),
            None => json!({ "status": "fatal" }),
        }
    }
}
