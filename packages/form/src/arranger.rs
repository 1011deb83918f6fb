//! The visitor contract consulted while reconstructing nested values.

use isoresource_core::Value;

use crate::error::FormError;

/// Result of descending one key segment.
#[derive(Clone, Debug)]
pub struct NextRet<C> {
    /// Position in the arranger's own model (a schema node, for example).
    pub cursor: C,
    /// Value to use when the client did not send anything for this node.
    pub default: Option<Value>,
}

impl<C> NextRet<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }
}

/// Outcome of a leaf-level arrange step.
#[derive(Clone, Debug, PartialEq)]
pub enum Arranged {
    /// The arranger produced a new value.
    Cast(Value),
    /// The arranger declined; the raw value is kept.
    Kept(Value),
}

impl Arranged {
    pub fn is_arranged(&self) -> bool {
        matches!(self, Arranged::Cast(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Arranged::Cast(value) | Arranged::Kept(value) => value,
        }
    }
}

/// Drives the form parser.
///
/// For a key like `items[2].qty` the parser calls `next("items")`, then
/// `next_item`, then `next("qty")`, and finally
/// `arrange_property_on_last` with the raw value. After every key has been
/// placed, `normalize` sees the whole reconstructed value.
pub trait Arranger {
    type Cursor: Clone;

    /// Cursor for the top-level object.
    fn root(&self) -> Self::Cursor;

    /// Descend into property `name`.
    fn next(&self, cursor: &Self::Cursor, name: &str) -> Result<NextRet<Self::Cursor>, FormError>;

    /// Descend into the element type of the array at `cursor`.
    fn next_item(&self, cursor: &Self::Cursor) -> Result<NextRet<Self::Cursor>, FormError>;

    /// `name[idx]` as the final segment; `cursor` is the element cursor.
    fn arrange_indexed_array_item_on_last(
        &self,
        cursor: &Self::Cursor,
        value: Value,
    ) -> Result<Arranged, FormError>;

    /// `name[]` as the final segment; `cursor` is the array's own cursor.
    fn arrange_unindexed_array_on_last(
        &self,
        cursor: &Self::Cursor,
        name: &str,
        values: Vec<Value>,
    ) -> Result<Arranged, FormError>;

    /// A plain property as the final segment.
    fn arrange_property_on_last(
        &self,
        cursor: &Self::Cursor,
        name: &str,
        value: Value,
    ) -> Result<Arranged, FormError>;

    /// Final pass over the reconstructed value.
    fn normalize(&self, value: Value) -> Result<Value, FormError>;
}

/// Accepts every path and keeps every value as sent.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughArranger;

impl Arranger for PassthroughArranger {
    type Cursor = ();

    fn root(&self) {}

    fn next(&self, _cursor: &(), _name: &str) -> Result<NextRet<()>, FormError> {
        Ok(NextRet::new(()))
    }

    fn next_item(&self, _cursor: &()) -> Result<NextRet<()>, FormError> {
        Ok(NextRet::new(()))
    }

    fn arrange_indexed_array_item_on_last(&self, _cursor: &(), value: Value) -> Result<Arranged, FormError> {
        Ok(Arranged::Kept(value))
    }

    fn arrange_unindexed_array_on_last(
        &self,
        _cursor: &(),
        _name: &str,
        values: Vec<Value>,
    ) -> Result<Arranged, FormError> {
        Ok(Arranged::Kept(Value::Array(values)))
    }

    fn arrange_property_on_last(&self, _cursor: &(), _name: &str, value: Value) -> Result<Arranged, FormError> {
        Ok(Arranged::Kept(value))
    }

    fn normalize(&self, value: Value) -> Result<Value, FormError> {
        Ok(value)
    }
}
