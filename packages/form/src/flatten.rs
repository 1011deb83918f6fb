//! Nested value back to flat form pairs.

use isoresource_core::Value;

use crate::error::FormError;

/// Flatten an object into `(key, text)` pairs the parser reads back.
///
/// Arrays of scalars become repeated `name[]` pairs (an empty array becomes a
/// single empty `name[]`). Arrays holding objects or holes use indexed keys.
/// Absent and null fields, files and raw bytes are left out.
///
/// ```rust
/// use isoresource_core::Value;
/// use isoresource_form::flatten;
///
/// let value = Value::object([
///     ("title", Value::from("Ship it")),
///     ("tags", Value::from(vec!["a", "b"])),
/// ]);
/// assert_eq!(flatten(&value).unwrap(), vec![
///     ("tags[]".to_string(), "a".to_string()),
///     ("tags[]".to_string(), "b".to_string()),
///     ("title".to_string(), "Ship it".to_string()),
/// ]);
/// ```
pub fn flatten(value: &Value) -> Result<Vec<(String, String)>, FormError> {
    let mut pairs = Vec::new();
    match value {
        Value::Undefined | Value::Null => {}
        Value::Map(_) => walk("", value, &mut pairs)?,
        other => {
            return Err(FormError::NotAnObject {
                found: other.type_name(),
            })
        }
    }
    Ok(pairs)
}

fn walk(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) -> Result<(), FormError> {
    match value {
        Value::Map(entries) => {
            for (name, child) in entries {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };
                walk(&key, child, pairs)?;
            }
        }
        Value::Array(items) => {
            if items.iter().any(Value::is_array) {
                return Err(FormError::NestedArray {
                    key: prefix.to_string(),
                });
            }
            let needs_index = items.iter().any(|item| item.is_map() || item.is_undefined());
            if !needs_index {
                let key = format!("{}[]", prefix);
                if items.is_empty() {
                    pairs.push((key.clone(), String::new()));
                }
                for item in items {
                    if let Some(text) = item.to_scalar_string() {
                        pairs.push((key.clone(), text));
                    }
                }
                return Ok(());
            }
            for (index, item) in items.iter().enumerate() {
                walk(&format!("{}[{}]", prefix, index), item, pairs)?;
            }
        }
        Value::Undefined | Value::Null | Value::File(_) | Value::Bytes(_) => {}
        scalar => {
            if let Some(text) = scalar.to_scalar_string() {
                pairs.push((prefix.to_string(), text));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_arrays_of_objects_and_holes() {
        let value = Value::object([(
            "items",
            Value::Array(vec![
                Value::Undefined,
                Value::object([("qty", Value::from(2i64))]),
            ]),
        )]);
        assert_eq!(
            flatten(&value).unwrap(),
            vec![("items[1].qty".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn empty_array_is_kept() {
        let value = Value::object([("tags", Value::array())]);
        assert_eq!(
            flatten(&value).unwrap(),
            vec![("tags[]".to_string(), String::new())]
        );
    }

    #[test]
    fn rejects_nested_arrays_and_scalars() {
        let value = Value::object([("grid", Value::Array(vec![Value::from(vec![1i64])]))]);
        assert_eq!(
            flatten(&value),
            Err(FormError::NestedArray {
                key: "grid".to_string()
            })
        );
        assert!(matches!(
            flatten(&Value::from("text")),
            Err(FormError::NotAnObject { found: "string" })
        ));
    }
}
