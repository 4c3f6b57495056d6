//! Typed access to the JSON arguments of a tool call.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StagehandError;

/// Arguments supplied to a tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    inner: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        Self { inner: value }
    }

    /// Arguments from a JSON object map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            inner: Value::Object(map),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.inner
    }

    /// All arguments as an object map. Non-object values yield an empty map.
    pub fn to_map(&self) -> Map<String, Value> {
        match &self.inner {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, StagehandError> {
        self.inner
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(key, "string"))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, StagehandError> {
        self.inner
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(key, "integer"))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, StagehandError> {
        self.inner
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing(key, "number"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, StagehandError> {
        self.inner
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing(key, "boolean"))
    }

    /// Deserialize all arguments into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StagehandError> {
        serde_json::from_value(self.inner.clone())
            .map_err(|e| StagehandError::InvalidArgument(e.to_string()))
    }
}

fn missing(key: &str, expected: &str) -> StagehandError {
    StagehandError::InvalidArgument(format!("Missing or invalid {expected} argument '{key}'"))
}

/// Coerce raw model-supplied arguments into an object map.
///
/// Models sometimes send arguments as a JSON-encoded string, or nothing at all.
pub fn coerce_arguments(value: Value) -> Result<Map<String, Value>, StagehandError> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(Map::new());
            }
            let parsed: Value = serde_json::from_str(trimmed).map_err(|e| {
                StagehandError::InvalidArgument(format!("Tool arguments must be valid JSON: {e}"))
            })?;
            match parsed {
                Value::String(_) => Err(StagehandError::InvalidArgument(
                    "Tool arguments must be a JSON object".into(),
                )),
                other => coerce_arguments(other),
            }
        }
        other => Err(StagehandError::InvalidArgument(format!(
            "Tool arguments must be a JSON object; got {other}"
        ))),
    }
}
