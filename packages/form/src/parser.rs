//! Reconstruct nested values from a [`FlatRecord`].

use std::collections::BTreeMap;

use isoresource_core::{Schema, Value};

use crate::arranger::Arranger;
use crate::error::FormError;
use crate::key::{FormKey, Segment};
use crate::record::FlatRecord;
use crate::schema_arranger::SchemaArranger;

/// Highest array index a form key may address.
///
/// Indices come from the client, and every gap below them is filled with a hole.
pub const MAX_ARRAY_INDEX: usize = 1000;

/// Place every key of `record` without the final `normalize` pass.
pub fn arrange<A: Arranger>(record: &FlatRecord, arranger: &A) -> Result<Value, FormError> {
    let root_cursor = arranger.root();
    let mut root = BTreeMap::new();
    for (key, raw) in record.iter() {
        let parsed = FormKey::parse(key)?;
        assign(arranger, &mut root, &root_cursor, parsed.segments(), raw.clone())
            .map_err(|e| e.at_key(key))?;
    }
    Ok(Value::Map(root))
}

/// Arrange `record`, then let the arranger normalise the result.
pub fn parse<A: Arranger>(record: &FlatRecord, arranger: &A) -> Result<Value, FormError> {
    let arranged = arrange(record, arranger)?;
    arranger.normalize(arranged)
}

/// Parse a form body against `schema`.
///
/// The result equals `schema.parse` of the reconstructed value, so a body that
/// passes here needs no second validation.
pub fn parse_form_body(record: &FlatRecord, schema: &Schema) -> Result<Value, FormError> {
    parse(record, &SchemaArranger::new(schema))
}

fn assign<A: Arranger>(
    arranger: &A,
    target: &mut BTreeMap<String, Value>,
    cursor: &A::Cursor,
    segments: &[Segment],
    raw: Value,
) -> Result<(), FormError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    match segment {
        Segment::Property(name) => {
            let field = arranger.next(cursor, name)?;
            let slot = target.entry(name.clone()).or_default();
            if rest.is_empty() {
                let raw = or_default(raw, field.default);
                let value = arranger
                    .arrange_property_on_last(&field.cursor, name, raw)?
                    .into_value();
                set_leaf(slot, value)
            } else {
                let child = map_slot(slot, field.default)?;
                assign(arranger, child, &field.cursor, rest, raw)
            }
        }
        Segment::Indexed(name, index) => {
            let field = arranger.next(cursor, name)?;
            let item = arranger.next_item(&field.cursor)?;
            let items = array_slot(target.entry(name.clone()).or_default(), field.default)?;
            let slot = item_slot(items, *index)?;
            if rest.is_empty() {
                let raw = or_default(raw, item.default);
                let value = arranger
                    .arrange_indexed_array_item_on_last(&item.cursor, raw)?
                    .into_value();
                set_leaf(slot, value)
            } else {
                let child = map_slot(slot, item.default)?;
                assign(arranger, child, &item.cursor, rest, raw)
            }
        }
        // FormKey guarantees `[]` only ever appears last.
        Segment::Unindexed(name) => {
            let field = arranger.next(cursor, name)?;
            let value = arranger
                .arrange_unindexed_array_on_last(&field.cursor, name, unindexed_items(raw))?
                .into_value();
            set_leaf(target.entry(name.clone()).or_default(), value)
        }
    }
}

/// `name[]` accepts nothing, a scalar, or a repeated field.
fn unindexed_items(raw: Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items,
        Value::Undefined | Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        scalar => vec![scalar],
    }
}

/// An empty submission falls back to the node's declared default.
fn or_default(raw: Value, default: Option<Value>) -> Value {
    let empty = match &raw {
        Value::Undefined => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    match default {
        Some(default) if empty => default,
        _ => raw,
    }
}

/// The slot at `index`, padding any gap with `Undefined` holes.
fn item_slot(items: &mut Vec<Value>, index: usize) -> Result<&mut Value, FormError> {
    let len = index
        .checked_add(1)
        .filter(|_| index <= MAX_ARRAY_INDEX)
        .ok_or(FormError::IndexOutOfRange { key: String::new(), index })?;
    if items.len() < len {
        items.resize(len, Value::Undefined);
    }
    Ok(&mut items[index])
}

fn set_leaf(slot: &mut Value, value: Value) -> Result<(), FormError> {
    if slot.is_map() || slot.is_array() {
        return Err(FormError::Conflict { key: String::new() });
    }
    *slot = value;
    Ok(())
}

fn map_slot(slot: &mut Value, default: Option<Value>) -> Result<&mut BTreeMap<String, Value>, FormError> {
    if slot.is_undefined() {
        *slot = match default {
            Some(default @ Value::Map(_)) => default,
            _ => Value::map(),
        };
    }
    slot.as_map_mut()
        .ok_or(FormError::Conflict { key: String::new() })
}

fn array_slot(slot: &mut Value, default: Option<Value>) -> Result<&mut Vec<Value>, FormError> {
    if slot.is_undefined() {
        *slot = match default {
            Some(default @ Value::Array(_)) => default,
            _ => Value::array(),
        };
    }
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(FormError::Conflict { key: String::new() }),
    }
}
