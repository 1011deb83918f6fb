//! # isoresource-suspense
//!
//! A per-context cache of resource reads that lets the same rendering code run
//! during server rendering and during client hydration without fetching twice.
//!
//! - [`SuspenseCache`]: read-or-suspend entries keyed by [`cache_key`], with
//!   an await-based `get_or_fetch` over the same entries and [`Purge`] rules
//! - [`TransferCache`]: values resolved on the server, served once on the client
//! - [`ScriptInjector`]: writes resolved values into streamed HTML
//!
//! ```rust
//! use isoresource_core::{BoxError, Value};
//! use isoresource_suspense::{SuspenseCache, Suspended};
//!
//! # async fn demo() {
//! let cache = SuspenseCache::new();
//! let load = || async { Ok::<_, BoxError>(Value::from("ready")) };
//!
//! let value = match cache.suspend("greeting", load) {
//!     Ok(value) => value,
//!     Err(Suspended::Pending(read)) => {
//!         read.await.unwrap();
//!         cache.suspend("greeting", load).unwrap()
//!     }
//!     Err(Suspended::Failed(error)) => panic!("{error}"),
//! };
//! assert_eq!(value, Value::from("ready"));
//! # }
//! ```

mod cache;
mod error;
mod inject;
mod key;
mod reader;
mod transfer;

pub use cache::{Purge, SuspenseCache};
pub use error::{DecodeError, SharedError, Suspended};
pub use inject::{ScriptInjector, DEFAULT_GLOBAL};
pub use key::cache_key;
pub use reader::PendingRead;
pub use transfer::TransferCache;

pub(crate) const SUSPENSE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cache");
