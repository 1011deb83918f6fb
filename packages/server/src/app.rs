//! The application context threaded into the dispatcher.
//!
//! Host applications supply two collaborators: an [`OptionsFactory`] deriving
//! the per-call options (identity, tenant, database handle) from a request,
//! and optionally a [`PageRenderer`] for page actions.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use isoresource_core::{BoxError, ValidationError, Value};

use crate::config::DispatchConfig;
use crate::request::Request;
use crate::response::Response;

/// Computes the options passed as the trailing argument of every resource
/// method call.
#[async_trait]
pub trait OptionsFactory<O>: Send + Sync {
    async fn options(&self, request: &Request) -> Result<O, BoxError>;
}

#[async_trait]
impl<O, F> OptionsFactory<O> for F
where
    F: Fn(&Request) -> Result<O, BoxError> + Send + Sync,
    O: Send + 'static,
{
    async fn options(&self, request: &Request) -> Result<O, BoxError> {
        self(request)
    }
}

/// What a page render receives.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub resource: &'a str,
    pub action: &'a str,
    /// Action output, or the rejected input with defaults filled.
    pub data: &'a Value,
    pub errors: Option<&'a ValidationError>,
    pub status: StatusCode,
}

/// Renders full pages for page actions.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, request: &Request, view: PageView<'_>) -> Result<Response, BoxError>;

    /// Error page for fatal failures of page requests.
    async fn render_error(&self, _request: &Request, status: StatusCode, message: &str) -> Result<Response, BoxError> {
        let title = status.canonical_reason().unwrap_or("Error");
        Ok(Response::html(
            status,
            format!(
                "<!doctype html><title>{}</title><h1>{}</h1><p>{}</p>",
                title,
                title,
                escape_html(message)
            ),
        ))
    }
}

/// Configuration and host collaborators, built once at startup.
pub struct AppContext<O> {
    pub config: DispatchConfig,
    options: Arc<dyn OptionsFactory<O>>,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl<O: Send + 'static> AppContext<O> {
    pub fn new(config: DispatchConfig, options: impl OptionsFactory<O> + 'static) -> Self {
        Self {
            config,
            options: Arc::new(options),
            renderer: None,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub async fn options(&self, request: &Request) -> Result<O, BoxError> {
        self.options.options(request).await
    }

    pub fn renderer(&self) -> Option<&dyn PageRenderer> {
        self.renderer.as_deref()
    }
}

impl AppContext<()> {
    /// A context whose resources take no options.
    pub fn without_options(config: DispatchConfig) -> Self {
        Self::new(config, |_: &Request| Ok::<(), BoxError>(()))
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
