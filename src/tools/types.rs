//! Tool-related types: parameter schemas and server-declared descriptors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema-based parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    /// JSON Schema object describing the parameters.
    pub schema: Value,
}

impl ToolParameters {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Create an empty parameter schema (no parameters).
    pub fn empty() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// An object schema accepting arbitrary keys.
    pub fn free_form(description: impl Into<String>) -> Self {
        Self {
            schema: json!({
                "type": "object",
                "description": description.into(),
                "properties": {},
                "additionalProperties": true,
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for constructing tool parameter schemas.
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn insert(mut self, name: String, schema: Value, required: bool) -> Self {
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    /// Add a string property.
    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "string", "description": description.into() });
        self.insert(name.into(), schema, required)
    }

    /// Add a number property.
    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "number", "description": description.into() });
        self.insert(name.into(), schema, required)
    }

    /// Add a boolean property.
    pub fn boolean(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "boolean", "description": description.into() });
        self.insert(name.into(), schema, required)
    }

    /// Add a nested free-form object property.
    pub fn object(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({
            "type": "object",
            "description": description.into(),
            "additionalProperties": true,
        });
        self.insert(name.into(), schema, required)
    }

    /// Add an enum (string) property.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let schema = json!({
            "type": "string",
            "description": description.into(),
            "enum": values,
        });
        self.insert(name.into(), schema, required)
    }

    /// Add an enumerated choice where each option carries its own description.
    ///
    /// Rendered as `oneOf` over `const` values so models see why each option exists.
    pub fn described_choice<'a>(
        self,
        name: impl Into<String>,
        options: impl IntoIterator<Item = (&'a str, &'a str)>,
        required: bool,
    ) -> Self {
        let one_of: Vec<Value> = options
            .into_iter()
            .map(|(value, description)| json!({ "const": value, "description": description }))
            .collect();
        self.insert(name.into(), json!({ "oneOf": one_of }), required)
    }

    /// Build into ToolParameters.
    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

/// A tool as declared by a workflow server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    ToolParameters::empty().schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_builder_constructs_schema() {
        let params = ToolParameters::object()
            .string("property_id", "Property identifier", true)
            .number("budget", "Budget in USD", false)
            .object("constraints", "Rebalance constraints", false)
            .build();

        let schema = &params.schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["property_id"]["type"], "string");
        assert_eq!(schema["properties"]["constraints"]["additionalProperties"], true);
        assert_eq!(schema["required"], json!(["property_id"]));
    }

    #[test]
    fn described_choice_renders_one_of_consts() {
        let params = ToolParameters::object()
            .described_choice("server_name", [("zillow", "Real estate"), ("travel", "Trips")], true)
            .build();

        let options = params.schema["properties"]["server_name"]["oneOf"]
            .as_array()
            .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0]["const"], "zillow");
        assert_eq!(options[1]["description"], "Trips");
    }

    #[test]
    fn descriptor_defaults_missing_schema() {
        let tool: ToolDescriptor = serde_json::from_value(json!({"name": "ping"})).unwrap();
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema["type"], "object");
    }
}
