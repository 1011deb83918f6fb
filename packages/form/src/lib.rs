//! # isoresource-form
//!
//! Turns flat form-encoded records into nested values.
//!
//! Keys use dot-separated nesting plus two array markers:
//!
//! ```text
//! user.name=Ada          -> { user: { name: "Ada" } }
//! tags[]=a&tags[]=b      -> { tags: ["a", "b"] }
//! items[1].qty=2         -> { items: [<hole>, { qty: 2 }] }
//! ```
//!
//! Parsing is driven by an [`Arranger`], a visitor consulted at every key
//! segment. [`SchemaArranger`] implements it against a `Schema`, casting leaf
//! strings to the types the schema expects before the schema validates the
//! whole value.
//!
//! ```rust
//! use isoresource_core::{Schema, Value};
//! use isoresource_form::{parse_form_body, FlatRecord};
//!
//! let schema = Schema::object([("age", Schema::number())]);
//! let record = FlatRecord::from_pairs([("age", "20")]);
//! let value = parse_form_body(&record, &schema).unwrap();
//! assert_eq!(value.get("age"), Some(&Value::Integer(20)));
//! ```

mod arranger;
mod error;
mod flatten;
mod key;
mod parser;
mod record;
mod schema_arranger;

pub use arranger::{Arranged, Arranger, NextRet, PassthroughArranger};
pub use error::FormError;
pub use flatten::flatten;
pub use key::{FormKey, Segment};
pub use parser::{arrange, parse, parse_form_body, MAX_ARRAY_INDEX};
pub use record::FlatRecord;
pub use schema_arranger::SchemaArranger;

/// Tracing target for arranging and casting decisions.
pub(crate) const ARRANGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::arrange");
