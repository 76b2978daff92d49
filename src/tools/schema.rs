//! Structural parameter schemas for tools.
//!
//! A [`ParameterSchema`] is the JSON Schema subset tools advertise to the
//! model (`{"type": "object", "properties": ..., "required": [...]}`) and the
//! executor validates calls against before dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// JSON type of a single named parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    required: Vec<String>,
}

impl ParameterSchema {
    /// An object schema with no parameters.
    pub fn object() -> Self {
        Self {
            kind: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Adds a parameter the caller must supply.
    pub fn required(mut self, name: &str, kind: ParamType, description: &str) -> Self {
        self.required.push(name.to_string());
        self.property(name, kind, description, None)
    }

    /// Adds a parameter the caller may omit, with the value used in its place.
    pub fn optional(
        self,
        name: &str,
        kind: ParamType,
        description: &str,
        default: Option<Value>,
    ) -> Self {
        self.property(name, kind, description, default)
    }

    fn property(
        mut self,
        name: &str,
        kind: ParamType,
        description: &str,
        default: Option<Value>,
    ) -> Self {
        self.properties.insert(
            name.to_string(),
            PropertySchema {
                kind,
                description: description.to_string(),
                default,
            },
        );
        self
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertySchema> {
        &self.properties
    }

    pub fn required_names(&self) -> &[String] {
        &self.required
    }

    /// Serialized JSON Schema, as sent to the model.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Checks that every required parameter is present and non-null and that
    /// every declared parameter that is present has the declared type.
    ///
    /// Parameters the schema does not mention are ignored.
    pub fn validate(&self, params: &Map<String, Value>) -> Result<(), String> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|name| params.get(name.as_str()).map_or(true, Value::is_null))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "missing required parameter(s): {}",
                missing.join(", ")
            ));
        }

        for (name, value) in params {
            if value.is_null() {
                continue;
            }
            if let Some(prop) = self.properties.get(name) {
                if !prop.kind.accepts(value) {
                    return Err(format!("parameter '{}' must be of type {}", name, prop.kind));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_schema() -> ParameterSchema {
        ParameterSchema::object()
            .required("query", ParamType::String, "The search query")
            .optional("num_results", ParamType::Integer, "How many", Some(json!(5)))
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn serializes_as_json_schema() {
        let json = search_schema().to_json();
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"], json!(["query"]));
        assert_eq!(json["properties"]["num_results"]["default"], 5);
        assert_eq!(json["properties"]["query"]["type"], "string");
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let err = search_schema().validate(&params(json!({}))).unwrap_err();
        assert!(err.contains("query"));
    }

    #[test]
    fn null_required_parameter_counts_as_missing() {
        let err = search_schema()
            .validate(&params(json!({"query": null})))
            .unwrap_err();
        assert!(err.contains("query"));
    }

    #[test]
    fn wrong_type_is_reported() {
        let err = search_schema()
            .validate(&params(json!({"query": "cats", "num_results": "three"})))
            .unwrap_err();
        assert!(err.contains("num_results"));
        assert!(err.contains("integer"));
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        assert!(search_schema()
            .validate(&params(json!({"query": "cats", "lang": "en"})))
            .is_ok());
    }
}
