//! Total predicates over raw JSON input.

use serde_json::Value;

use crate::id::Id;

/// Returns `true` unless `value` is a structured container (object or array).
pub fn is_invalid_item(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Returns `true` if an id is present but is neither a string nor a finite
/// integer. An absent id is valid: it will be allocated.
pub fn is_invalid_id(id: Option<&Value>) -> bool {
    match id {
        None => false,
        Some(value) => Id::from_value(value).is_err(),
    }
}
