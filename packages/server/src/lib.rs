//! Server side of isoresource: registering resources, arranging request
//! input and answering requests through the responder protocol.
//!
//! - [`RouterBuilder`] registers resources and builds a frozen [`RouteTable`]
//! - [`Dispatcher`] matches requests and drives them to a [`Response`]
//! - [`arrange_input`] gathers input from the request sources
//! - [`LocalProxy`] calls resources in-process with validated input
//! - [`Adapter`] customises single actions with handlers, responders or
//!   callbacks
//!
//! # Example
//!
//! ```rust
//! use isoresource_core::{ActionDescriptor, BoxError, InputDescriptor, Method, Schema, Value};
//! use isoresource_server::{AppContext, DispatchConfig, Dispatcher, Request, Resource, ResourceRouteConfig, RouterBuilder};
//!
//! # async fn demo() -> Result<(), BoxError> {
//! let greeter = Resource::<()>::new().method("hello", |input, _options| async move {
//!     let name = input.as_ref().and_then(|v| v.get("name")).cloned().unwrap_or_default();
//!     Ok::<_, BoxError>(Value::object([("greeting", name)]))
//! });
//!
//! let mut router = RouterBuilder::<()>::new();
//! router.mount(
//!     "/greeter",
//!     ResourceRouteConfig::new("greeter")
//!         .action(ActionDescriptor::new("hello", "/$name", Method::GET))
//!         .input("hello", InputDescriptor::new(Schema::object([("name", Schema::string())]))),
//!     greeter,
//! )?;
//!
//! let dispatcher = Dispatcher::new(router.build().await?, AppContext::without_options(DispatchConfig::default()));
//! let response = dispatcher.handle(Request::get("/greeter/ada")).await;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

mod adapter;
mod app;
mod config;
mod dispatch;
mod error;
mod input;
mod proxy;
mod registry;
mod request;
mod resource;
mod response;
mod table;
pub mod telemetry;

pub use adapter::{
    callback, handler, Adapter, AdapterEntry, AdapterKind, FatalHook, HandlerFn, InputHook, InvalidHook, OverrideFn,
    RequestCallback, Responder, SuccessHook, SuccessOutcome,
};
pub use app::{AppContext, OptionsFactory, PageRenderer, PageView};
pub use config::{DispatchConfig, Environment, ENV_VAR, UPLOAD_DIR_VAR};
pub use dispatch::Dispatcher;
pub use error::{CallErrorKind, ConfigurationError, InputError, LoadError, ResourceCallingError};
pub use input::{arrange_input, BodyStrategy, Cleanup};
pub use proxy::LocalProxy;
pub use registry::{ResourceRouteConfig, RouterBuilder, RouterCore, Scope};
pub use request::{Request, RequestContext, REQUESTED_WITH};
pub use resource::{Resource, ResourceMethod, ResourceModule};
pub use response::{envelope, Response};
pub use table::{Route, RouteMatch, RouteTable};
pub use telemetry::init_tracing;
