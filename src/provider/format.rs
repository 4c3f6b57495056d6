//! Provider formatting helpers.

use serde_json::Value;

/// Convert a JSON value into the string payload chat APIs expect.
///
/// Strings pass through unquoted; everything else is compact JSON.
pub(crate) fn value_to_payload(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
