//! # isoresource-client
//!
//! Calls resources over HTTP with the same convention as in-process calls.
//!
//! A [`RemoteProxy`] is built from the [`ResourceManifest`] the server exports
//! for a mounted resource. Calling an action validates the input against the
//! action's schema, substitutes `$name` path parameters, sends the rest as a
//! query string or JSON body depending on the verb, and unwraps the response
//! envelope:
//!
//! | response                      | result                     |
//! |-------------------------------|----------------------------|
//! | 2xx `{status: "success"}`     | `Ok(data)`                 |
//! | 422 with `errors`             | `RemoteError::Validation`  |
//! | other 4xx                     | `RemoteError::Client`      |
//! | 5xx                           | `RemoteError::Server`      |
//!
//! ```rust,no_run
//! use isoresource_client::{ClientConfig, RemoteClient};
//! use isoresource_core::{ResourceManifest, ResourceProxy, Value};
//!
//! # async fn demo(manifest: ResourceManifest) -> Result<(), Box<dyn std::error::Error>> {
//! let client = RemoteClient::new(ClientConfig::new("http://localhost:3000")?)?;
//! let tasks = client.proxy(&manifest)?;
//! let _task = tasks
//!     .call("show", Some(Value::object([("id", Value::from(1i64))])))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ResourceManifest`]: isoresource_core::ResourceManifest

mod config;
mod error;
mod executor;
mod remote;
mod types;

pub use config::{ClientConfig, BASE_URL_VAR, DEFAULT_TIMEOUT};
pub use error::RemoteError;
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use remote::{unwrap_envelope, RemoteClient, RemoteProxy, REQUESTED_WITH};
pub use types::{HttpRequest, HttpResponse};

pub(crate) const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::remote");
