//! Where remote calls actually leave the process.
//!
//! Proxies talk to an [`HttpExecutor`] so tests can swap the network for a
//! scripted [`mock::MockExecutor`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::config::DEFAULT_TIMEOUT;
use crate::types::{HttpRequest, HttpResponse};

/// Sends one request. Errors are transport failures only; any HTTP status
/// comes back as a response.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

/// Production executor on a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { client })
    }

    pub fn with_default_timeout() -> Result<Self, String> {
        Self::new(DEFAULT_TIMEOUT)
    }

    /// Reuse an existing client and its connection pool.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let method: http::Method = request.method.into();

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::try_from(name.as_str()).map_err(|e| e.to_string())?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| e.to_string())?;
            headers.append(name, value);
        }

        let mut builder = self.client.request(method, &request.url).headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let mut response_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let body_text = response.text().await.map_err(|e| e.to_string())?;

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body_text,
        })
    }
}

/// Scripted executor for unit tests.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Returns canned responses keyed by request URL path.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
        default_response: Arc<Mutex<Option<HttpResponse>>>,
        recorded_requests: Arc<Mutex<Vec<HttpRequest>>>,
        error_message: Arc<Mutex<Option<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, path: impl Into<String>, response: HttpResponse) -> Self {
            self.responses.lock().unwrap().insert(path.into(), response);
            self
        }

        pub fn with_default_response(self, response: HttpResponse) -> Self {
            *self.default_response.lock().unwrap() = Some(response);
            self
        }

        /// Fail every request as if the connection broke.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            *self.error_message.lock().unwrap() = Some(message.into());
            self
        }

        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.recorded_requests.lock().unwrap().clone()
        }

        pub fn success_response(data: serde_json::Value) -> HttpResponse {
            HttpResponse::json(200, &serde_json::json!({ "status": "success", "data": data }))
        }

        pub fn error_response(status: u16, message: &str) -> HttpResponse {
            HttpResponse::json(status, &serde_json::json!({ "status": "fatal", "message": message }))
        }

        pub fn not_found() -> HttpResponse {
            Self::error_response(404, "Not Found")
        }
    }

    #[async_trait]
    impl HttpExecutor for MockExecutor {
        async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
            self.recorded_requests.lock().unwrap().push(request.clone());

            if let Some(message) = self.error_message.lock().unwrap().clone() {
                return Err(message);
            }

            let path = url::Url::parse(&request.url)
                .map(|url| url.path().to_string())
                .unwrap_or_else(|_| request.url.clone());
            if let Some(response) = self.responses.lock().unwrap().get(&path) {
                return Ok(response.clone());
            }
            Ok(self
                .default_response
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(Self::not_found))
        }
    }
}
