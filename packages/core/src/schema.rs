//! Declarative input schemas.
//!
//! A `Schema` is a serialisable tree describing the input an action accepts.
//! It validates (`parse`), fills defaults (`complete`) and exposes its shape
//! (`unwrap`, `field`, `element`, `default_value`) so that arrangers can
//! decide how to coerce flat form values before validation runs.
//!
//! Schemas travel inside a `ResourceManifest`, which is how a remote proxy
//! validates arguments with exactly the rules the server applies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Issue, IssueCode, IssuePath, PathSegment, ValidationError};
use crate::value::Value;

/// Inclusive numeric bounds: string length, numeric value or array length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Bounds {
    fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// A node in a schema tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    /// The canonical "no input" schema. Methods behind it receive only options.
    Blank,
    /// Accepts anything, unchanged.
    Any,
    String {
        #[serde(default, skip_serializing_if = "Bounds::is_empty")]
        bounds: Bounds,
    },
    Number {
        #[serde(default, skip_serializing_if = "Bounds::is_empty")]
        bounds: Bounds,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Bounds::is_empty")]
        bounds: Bounds,
    },
    Boolean,
    Date,
    Bigint,
    File,
    Enum {
        values: Vec<String>,
    },
    Literal {
        value: Value,
    },
    Array {
        items: Box<Schema>,
        #[serde(default, skip_serializing_if = "Bounds::is_empty")]
        bounds: Bounds,
    },
    Object {
        fields: BTreeMap<String, Schema>,
    },
    Optional {
        inner: Box<Schema>,
    },
    Nullable {
        inner: Box<Schema>,
    },
    Default {
        inner: Box<Schema>,
        value: Value,
    },
}

// === Construction ===

impl Schema {
    pub fn blank() -> Self {
        Schema::Blank
    }

    pub fn any() -> Self {
        Schema::Any
    }

    pub fn string() -> Self {
        Schema::String {
            bounds: Bounds::default(),
        }
    }

    pub fn number() -> Self {
        Schema::Number {
            bounds: Bounds::default(),
        }
    }

    pub fn integer() -> Self {
        Schema::Integer {
            bounds: Bounds::default(),
        }
    }

    pub fn boolean() -> Self {
        Schema::Boolean
    }

    pub fn date() -> Self {
        Schema::Date
    }

    pub fn bigint() -> Self {
        Schema::Bigint
    }

    pub fn file() -> Self {
        Schema::File
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Schema::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Schema::Literal {
            value: value.into(),
        }
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
            bounds: Bounds::default(),
        }
    }

    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::Object {
            fields: fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
        }
    }

    #[must_use]
    pub fn optional(self) -> Self {
        Schema::Optional {
            inner: Box::new(self),
        }
    }

    #[must_use]
    pub fn nullable(self) -> Self {
        Schema::Nullable {
            inner: Box::new(self),
        }
    }

    /// Value used when the input omits this field.
    #[must_use]
    pub fn default(self, value: impl Into<Value>) -> Self {
        Schema::Default {
            inner: Box::new(self),
            value: value.into(),
        }
    }

    /// Lower bound on length, value or item count, depending on the node.
    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        if let Some(bounds) = self.bounds_mut() {
            bounds.min = Some(min);
        }
        self
    }

    /// Upper bound on length, value or item count, depending on the node.
    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        if let Some(bounds) = self.bounds_mut() {
            bounds.max = Some(max);
        }
        self
    }

    fn bounds_mut(&mut self) -> Option<&mut Bounds> {
        match self {
            Schema::String { bounds }
            | Schema::Number { bounds }
            | Schema::Integer { bounds }
            | Schema::Array { bounds, .. } => Some(bounds),
            Schema::Optional { inner } | Schema::Nullable { inner } | Schema::Default { inner, .. } => {
                inner.bounds_mut()
            }
            _ => None,
        }
    }
}

// === Shape introspection ===

impl Schema {
    /// Is this the canonical "no input" schema?
    pub fn is_blank(&self) -> bool {
        matches!(self, Schema::Blank)
    }

    /// Strip `optional`, `nullable` and `default` wrappers.
    pub fn unwrapped(&self) -> &Schema {
        match self {
            Schema::Optional { inner } | Schema::Nullable { inner } | Schema::Default { inner, .. } => {
                inner.unwrapped()
            }
            other => other,
        }
    }

    /// Child schema of an object node (wrappers stripped first).
    pub fn field(&self, name: &str) -> Option<&Schema> {
        match self.unwrapped() {
            Schema::Object { fields } => fields.get(name),
            _ => None,
        }
    }

    /// Element schema of an array node (wrappers stripped first).
    pub fn element(&self) -> Option<&Schema> {
        match self.unwrapped() {
            Schema::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// The outermost declared default, if any wrapper carries one.
    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Schema::Default { value, .. } => Some(value),
            Schema::Optional { inner } | Schema::Nullable { inner } => inner.default_value(),
            _ => None,
        }
    }

    /// Short name of the node kind, wrappers stripped.
    pub fn kind_name(&self) -> &'static str {
        match self.unwrapped() {
            Schema::Blank => "blank",
            Schema::Any => "any",
            Schema::String { .. } => "string",
            Schema::Number { .. } => "number",
            Schema::Integer { .. } => "integer",
            Schema::Boolean => "boolean",
            Schema::Date => "date",
            Schema::Bigint => "bigint",
            Schema::File => "file",
            Schema::Enum { .. } => "enum",
            Schema::Literal { .. } => "literal",
            Schema::Array { .. } => "array",
            Schema::Object { .. } => "object",
            Schema::Optional { .. } | Schema::Nullable { .. } | Schema::Default { .. } => "wrapper",
        }
    }
}

// === Validation ===

impl Schema {
    /// Validate `value`, returning the normalised output.
    ///
    /// Unknown object keys are stripped, omitted fields receive their declared
    /// defaults and every violated field contributes one issue.
    pub fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let mut path = Vec::new();
        let output = self.parse_at(value, &mut path, &mut issues);
        if issues.is_empty() {
            Ok(output)
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Fill declared defaults without validating anything.
    ///
    /// Used to hand a best-effort view of rejected input to `invalid` hooks.
    pub fn complete(&self, value: &Value) -> Value {
        match self {
            Schema::Default { inner, value: default } => {
                if value.is_undefined() {
                    inner.complete(default)
                } else {
                    inner.complete(value)
                }
            }
            Schema::Optional { inner } | Schema::Nullable { inner } => {
                if value.is_nullish() {
                    value.clone()
                } else {
                    inner.complete(value)
                }
            }
            Schema::Object { fields } => {
                if !value.is_map() && !value.is_nullish() {
                    return value.clone();
                }
                let mut map = value.as_map().cloned().unwrap_or_default();
                for (name, field) in fields {
                    let current = map.get(name).cloned().unwrap_or_default();
                    let completed = field.complete(&current);
                    if !completed.is_undefined() {
                        map.insert(name.clone(), completed);
                    }
                }
                Value::Map(map)
            }
            Schema::Array { items, .. } => match value {
                Value::Array(values) => {
                    Value::Array(values.iter().map(|v| items.complete(v)).collect())
                }
                other => other.clone(),
            },
            _ => value.clone(),
        }
    }

    fn parse_at(&self, value: &Value, path: &mut IssuePath, issues: &mut Vec<Issue>) -> Value {
        match self {
            Schema::Blank => Value::Undefined,
            Schema::Any => value.clone(),
            Schema::Optional { inner } => {
                if value.is_undefined() {
                    Value::Undefined
                } else {
                    inner.parse_at(value, path, issues)
                }
            }
            Schema::Nullable { inner } => {
                if value.is_null() {
                    Value::Null
                } else {
                    inner.parse_at(value, path, issues)
                }
            }
            Schema::Default { inner, value: default } => {
                if value.is_undefined() {
                    inner.parse_at(default, path, issues)
                } else {
                    inner.parse_at(value, path, issues)
                }
            }
            Schema::String { bounds } => match value {
                Value::String(s) => {
                    check_bounds(bounds, s.chars().count() as f64, Measure::Length, path, issues);
                    value.clone()
                }
                other => type_issue("string", other, path, issues),
            },
            Schema::Number { bounds } => match value {
                Value::Integer(i) => {
                    check_bounds(bounds, *i as f64, Measure::Value, path, issues);
                    value.clone()
                }
                Value::Float(f) if f.is_finite() => {
                    check_bounds(bounds, *f, Measure::Value, path, issues);
                    value.clone()
                }
                other => type_issue("number", other, path, issues),
            },
            Schema::Integer { bounds } => match value {
                Value::Integer(i) => {
                    check_bounds(bounds, *i as f64, Measure::Value, path, issues);
                    value.clone()
                }
                Value::Float(f) if *f >= I64_UPPER => {
                    issues.push(Issue::new(
                        IssueCode::TooBig,
                        path.clone(),
                        format!("Number must be less than or equal to {}", i64::MAX),
                    ));
                    Value::Undefined
                }
                Value::Float(f) if *f < I64_LOWER => {
                    issues.push(Issue::new(
                        IssueCode::TooSmall,
                        path.clone(),
                        format!("Number must be greater than or equal to {}", i64::MIN),
                    ));
                    Value::Undefined
                }
                Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                    check_bounds(bounds, *f, Measure::Value, path, issues);
                    Value::Integer(*f as i64)
                }
                Value::Float(_) => {
                    issues.push(Issue::new(
                        IssueCode::NotInteger,
                        path.clone(),
                        "Expected integer, received float",
                    ));
                    Value::Undefined
                }
                other => type_issue("integer", other, path, issues),
            },
            Schema::Boolean => match value {
                Value::Bool(_) => value.clone(),
                other => type_issue("boolean", other, path, issues),
            },
            Schema::Date => match value {
                Value::Date(_) => value.clone(),
                // Wire form of a date.
                Value::String(s) => match DateTime::parse_from_rfc3339(s) {
                    Ok(date) => Value::Date(date.with_timezone(&Utc)),
                    Err(_) => {
                        issues.push(Issue::new(IssueCode::InvalidType, path.clone(), "Invalid date"));
                        Value::Undefined
                    }
                },
                other => type_issue("date", other, path, issues),
            },
            Schema::Bigint => match value {
                Value::BigInt(_) => value.clone(),
                Value::Integer(i) => Value::BigInt(*i as i128),
                // Wire form of a bigint.
                Value::String(s) => match s.parse::<i128>() {
                    Ok(i) => Value::BigInt(i),
                    Err(_) => type_issue("bigint", value, path, issues),
                },
                other => type_issue("bigint", other, path, issues),
            },
            Schema::File => match value {
                Value::File(_) => value.clone(),
                other => type_issue("file", other, path, issues),
            },
            Schema::Enum { values } => match value {
                Value::String(s) if values.iter().any(|v| v == s) => value.clone(),
                Value::Undefined => type_issue("string", value, path, issues),
                other => {
                    let expected = values
                        .iter()
                        .map(|v| format!("'{}'", v))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    let received = other
                        .to_scalar_string()
                        .unwrap_or_else(|| other.type_name().to_string());
                    issues.push(Issue::new(
                        IssueCode::InvalidEnumValue,
                        path.clone(),
                        format!(
                            "Invalid enum value. Expected {}, received '{}'",
                            expected, received
                        ),
                    ));
                    Value::Undefined
                }
            },
            Schema::Literal { value: expected } => {
                if value == expected {
                    value.clone()
                } else {
                    issues.push(Issue::new(
                        IssueCode::InvalidLiteral,
                        path.clone(),
                        format!(
                            "Invalid literal value, expected {}",
                            crate::json::value_to_json(expected.clone())
                        ),
                    ));
                    Value::Undefined
                }
            }
            Schema::Array { items, bounds } => match value {
                Value::Array(values) => {
                    check_bounds(bounds, values.len() as f64, Measure::Items, path, issues);
                    let mut output = Vec::with_capacity(values.len());
                    for (index, item) in values.iter().enumerate() {
                        path.push(PathSegment::Index(index));
                        output.push(items.parse_at(item, path, issues));
                        path.pop();
                    }
                    Value::Array(output)
                }
                other => type_issue("array", other, path, issues),
            },
            Schema::Object { fields } => match value {
                Value::Map(map) => {
                    let mut output = BTreeMap::new();
                    for (name, field) in fields {
                        let input = map.get(name).unwrap_or(&Value::Undefined);
                        path.push(PathSegment::Key(name.clone()));
                        let parsed = field.parse_at(input, path, issues);
                        path.pop();
                        if !parsed.is_undefined() {
                            output.insert(name.clone(), parsed);
                        }
                    }
                    Value::Map(output)
                }
                other => type_issue("object", other, path, issues),
            },
        }
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;

#[derive(Clone, Copy)]
enum Measure {
    Length,
    Value,
    Items,
}

fn check_bounds(bounds: &Bounds, actual: f64, measure: Measure, path: &IssuePath, issues: &mut Vec<Issue>) {
    if let Some(min) = bounds.min {
        if actual < min {
            let message = match measure {
                Measure::Length => format!("String must contain at least {} character(s)", min),
                Measure::Value => format!("Number must be greater than or equal to {}", min),
                Measure::Items => format!("Array must contain at least {} element(s)", min),
            };
            issues.push(Issue::new(IssueCode::TooSmall, path.clone(), message));
        }
    }
    if let Some(max) = bounds.max {
        if actual > max {
            let message = match measure {
                Measure::Length => format!("String must contain at most {} character(s)", max),
                Measure::Value => format!("Number must be less than or equal to {}", max),
                Measure::Items => format!("Array must contain at most {} element(s)", max),
            };
            issues.push(Issue::new(IssueCode::TooBig, path.clone(), message));
        }
    }
}

fn type_issue(expected: &str, received: &Value, path: &IssuePath, issues: &mut Vec<Issue>) -> Value {
    let message = if received.is_undefined() {
        "Required".to_string()
    } else {
        format!("Expected {}, received {}", expected, received.type_name())
    };
    issues.push(Issue::new(IssueCode::InvalidType, path.clone(), message));
    Value::Undefined
}
