//! Core isoresource: the data model shared by server and client.
//!
//! - `Value`: dynamically-typed tree reconstructed from requests and handed
//!   to resource methods
//! - `Schema`: declarative validation tree with shape introspection
//! - `PathPattern`: `$name` route patterns
//! - `ActionDescriptor` / `InputDescriptor`: how an action is bound to HTTP
//! - `ResourceProxy`: the calling convention shared by local and remote proxies
//!
//! # Example
//!
//! ```rust
//! use isoresource_core::{Schema, Value};
//!
//! let schema = Schema::object([("age", Schema::number())]);
//! let input = Value::object([("age", Value::from(20i64))]);
//! assert!(schema.parse(&input).is_ok());
//! ```

mod descriptor;
mod error;
mod json;
mod pattern;
mod proxy;
mod schema;
mod value;

pub use descriptor::{
    ActionDescriptor, InputDescriptor, ManifestAction, Method, ResourceManifest, ResponseType,
    Source,
};
pub use error::{Issue, IssueCode, IssuePath, PathSegment, ValidationError};
pub use json::{json_to_value, value_to_json};
pub use pattern::{ParamStyle, PathPattern, PatternError, PatternSegment};
pub use proxy::{BoxError, ResourceProxy, TypedCallError};
pub use schema::{Bounds, Schema};
pub use value::{FileHandle, Value};
