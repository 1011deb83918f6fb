//! [`Arranger`] backed by a declarative [`Schema`].
//!
//! Form fields always arrive as text. This arranger walks the schema alongside
//! the key path and casts leaves to the type the schema expects. A cast that
//! does not work out keeps the raw text, and the schema's own validation in
//! `normalize` reports the problem.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use isoresource_core::{Schema, Value};

use crate::arranger::{Arranged, Arranger, NextRet};
use crate::error::FormError;
use crate::ARRANGE_TARGET;

static ANY: Schema = Schema::Any;

/// Arranges form input against a schema tree.
#[derive(Clone, Copy, Debug)]
pub struct SchemaArranger<'s> {
    schema: &'s Schema,
}

impl<'s> SchemaArranger<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    fn child(schema: &'s Schema) -> NextRet<&'s Schema> {
        NextRet::new(schema).with_default(schema.default_value().cloned())
    }

    /// Best-effort cast of a leaf value to what `schema` expects.
    pub fn cast(schema: &Schema, value: Value) -> Arranged {
        let target = schema.unwrapped();
        if !matches!(value, Value::String(_)) {
            return Self::cast_non_text(target, value);
        }
        let text = value.as_str().unwrap_or_default().trim();

        // An empty field means "not sent" for every non-text type.
        if text.is_empty() && !matches!(target, Schema::String { .. } | Schema::Any | Schema::Enum { .. }) {
            return Arranged::Cast(Value::Undefined);
        }

        let cast = match target {
            Schema::Number { .. } | Schema::Integer { .. } => parse_number(text),
            Schema::Boolean => parse_bool(text),
            Schema::Date => parse_date(text),
            Schema::Bigint => text.parse::<i128>().ok().map(Value::BigInt),
            Schema::Literal { value: expected } => {
                (expected.to_scalar_string().as_deref() == Some(text)).then(|| expected.clone())
            }
            _ => return Arranged::Kept(value),
        };

        match cast {
            Some(cast) => Arranged::Cast(cast),
            None => {
                tracing::debug!(
                    target: ARRANGE_TARGET,
                    expected = target.kind_name(),
                    raw = text,
                    "cast failed, keeping raw value"
                );
                Arranged::Kept(value)
            }
        }
    }

    fn cast_non_text(target: &Schema, value: Value) -> Arranged {
        let cast = match (target, &value) {
            (Schema::String { .. }, Value::Integer(_) | Value::Float(_) | Value::Bool(_) | Value::BigInt(_)) => {
                value.to_scalar_string().map(Value::String)
            }
            (Schema::Date, Value::Integer(millis)) => DateTime::from_timestamp_millis(*millis).map(Value::Date),
            (Schema::Bigint, Value::Integer(i)) => Some(Value::BigInt(*i as i128)),
            _ => None,
        };
        match cast {
            Some(cast) => Arranged::Cast(cast),
            None => Arranged::Kept(value),
        }
    }

    fn unexpected(segment: &str, found: &Schema) -> FormError {
        FormError::UnexpectedPath {
            key: String::new(),
            segment: segment.to_string(),
            found: found.kind_name(),
        }
    }
}

impl<'s> Arranger for SchemaArranger<'s> {
    type Cursor = &'s Schema;

    fn root(&self) -> &'s Schema {
        self.schema
    }

    fn next(&self, cursor: &&'s Schema, name: &str) -> Result<NextRet<&'s Schema>, FormError> {
        match cursor.unwrapped() {
            Schema::Object { fields } => fields
                .get(name)
                .map(Self::child)
                .ok_or_else(|| Self::unexpected(name, cursor)),
            Schema::Any | Schema::Blank => Ok(NextRet::new(&ANY)),
            _ => Err(Self::unexpected(name, cursor)),
        }
    }

    fn next_item(&self, cursor: &&'s Schema) -> Result<NextRet<&'s Schema>, FormError> {
        match cursor.unwrapped() {
            Schema::Array { items, .. } => Ok(Self::child(items)),
            Schema::Any | Schema::Blank => Ok(NextRet::new(&ANY)),
            _ => Err(Self::unexpected("[]", cursor)),
        }
    }

    fn arrange_indexed_array_item_on_last(&self, cursor: &&'s Schema, value: Value) -> Result<Arranged, FormError> {
        Ok(Self::cast(cursor, value))
    }

    fn arrange_unindexed_array_on_last(
        &self,
        cursor: &&'s Schema,
        _name: &str,
        values: Vec<Value>,
    ) -> Result<Arranged, FormError> {
        match cursor.unwrapped() {
            Schema::Array { items, .. } => Ok(Arranged::Cast(Value::Array(
                values
                    .into_iter()
                    .map(|v| Self::cast(items, v).into_value())
                    .collect(),
            ))),
            _ => Ok(Arranged::Kept(Value::Array(values))),
        }
    }

    fn arrange_property_on_last(&self, cursor: &&'s Schema, name: &str, value: Value) -> Result<Arranged, FormError> {
        if matches!(cursor.unwrapped(), Schema::Array { .. }) {
            return Err(FormError::ArrayWithoutBrackets {
                key: String::new(),
                field: name.to_string(),
            });
        }
        Ok(Self::cast(cursor, value))
    }

    fn normalize(&self, value: Value) -> Result<Value, FormError> {
        Ok(self.schema.parse(&value)?)
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

fn parse_bool(text: &str) -> Option<Value> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(Value::Bool(true)),
        "false" | "off" | "0" | "no" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// RFC 3339, `<input type="date">`, `<input type="datetime-local">` or epoch
/// milliseconds. Zone-less forms are taken as UTC.
fn parse_date(text: &str) -> Option<Value> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(Value::Date(date.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Value::Date(naive.and_utc()));
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|naive| Value::Date(naive.and_utc()));
    }
    text.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(Value::Date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case(Schema::number(), "20", Value::Integer(20))]
    #[case(Schema::number(), "2.5", Value::Float(2.5))]
    #[case(Schema::number().optional(), "", Value::Undefined)]
    #[case(Schema::boolean(), "on", Value::Bool(true))]
    #[case(Schema::boolean(), "No", Value::Bool(false))]
    #[case(Schema::bigint(), "170141183460469231731687303715884105727", Value::BigInt(i128::MAX))]
    #[case(Schema::literal(true), "true", Value::Bool(true))]
    #[case(Schema::string(), "", Value::from(""))]
    fn casts_text(#[case] schema: Schema, #[case] raw: &str, #[case] expected: Value) {
        let arranged = SchemaArranger::cast(&schema, Value::from(raw));
        assert_eq!(arranged.into_value(), expected);
    }

    #[rstest]
    #[case(Schema::number(), "twenty")]
    #[case(Schema::boolean(), "maybe")]
    #[case(Schema::date(), "yesterday")]
    fn keeps_uncastable_text(#[case] schema: Schema, #[case] raw: &str) {
        assert_eq!(
            SchemaArranger::cast(&schema, Value::from(raw)),
            Arranged::Kept(Value::from(raw))
        );
    }

    #[test]
    fn casts_dates() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let schema = Schema::date();
        for raw in ["2024-03-01", "2024-03-01T00:00", "2024-03-01T00:00:00Z"] {
            assert_eq!(
                SchemaArranger::cast(&schema, Value::from(raw)).into_value(),
                Value::Date(midnight)
            );
        }
        assert_eq!(
            SchemaArranger::cast(&schema, Value::Integer(midnight.timestamp_millis())).into_value(),
            Value::Date(midnight)
        );
    }

    #[test]
    fn stringifies_scalars_for_string_fields() {
        assert_eq!(
            SchemaArranger::cast(&Schema::string(), Value::Integer(7)).into_value(),
            Value::from("7")
        );
    }

    #[test]
    fn unknown_paths_are_rejected() {
        let schema = Schema::object([("name", Schema::string())]);
        let arranger = SchemaArranger::new(&schema);
        let root = arranger.root();
        assert!(matches!(
            arranger.next(&root, "nope"),
            Err(FormError::UnexpectedPath { found: "object", .. })
        ));

        let name = arranger.next(&root, "name").unwrap().cursor;
        assert!(matches!(
            arranger.next(&name, "first"),
            Err(FormError::UnexpectedPath { found: "string", .. })
        ));
    }

    #[test]
    fn reports_defaults_through_wrappers() {
        let schema = Schema::object([("status", Schema::string().default("open").optional())]);
        let arranger = SchemaArranger::new(&schema);
        let next = arranger.next(&arranger.root(), "status").unwrap();
        assert_eq!(next.default, Some(Value::from("open")));
    }
}
