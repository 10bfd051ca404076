//! Parameter schemas for registered operations.
//!
//! Each operation declares its acceptable arguments up front; `validate`
//! checks a raw argument mapping against that declaration and returns the
//! coerced mapping with defaults filled in. Validation is pure and happens
//! before any remote call.

use serde_json::{json, Map, Value};

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// JSON Schema type name, also used in `TypeMismatch` messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl ParamSpec {
    pub fn required(param_type: ParamType) -> Self {
        Self {
            param_type,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(param_type: ParamType, default: Value) -> Self {
        Self {
            param_type,
            required: false,
            default: Some(default),
            description: None,
        }
    }

    pub fn describe(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }
}

/// Declared argument contract for one operation.
///
/// Declaration order is preserved so the rendered JSON Schema (and with it
/// the MCP tool listing) is stable across runs.
#[derive(Debug, Clone, Default)]
pub struct ParamSchema {
    params: Vec<(String, ParamSpec)>,
    permissive: bool,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: &str, spec: ParamSpec) -> Self {
        self.params.push((name.to_string(), spec));
        self
    }

    /// Allow keys not declared in the schema to pass through unchecked.
    pub fn permissive(mut self) -> Self {
        self.permissive = true;
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    /// Check `arguments` against the declaration and return the coerced
    /// mapping, with defaults applied for absent optional parameters.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<Map<String, Value>> {
        for (name, spec) in &self.params {
            match arguments.get(name) {
                Some(value) => {
                    if !spec.param_type.matches(value) {
                        return Err(GatewayError::TypeMismatch {
                            parameter: name.clone(),
                            expected: spec.param_type.name(),
                            actual: json_type_name(value),
                        });
                    }
                }
                None if spec.required => {
                    return Err(GatewayError::MissingParameter {
                        parameter: name.clone(),
                    });
                }
                None => {}
            }
        }

        if !self.permissive {
            for key in arguments.keys() {
                if !self.params.iter().any(|(name, _)| name == key) {
                    return Err(GatewayError::UnknownParameter {
                        parameter: key.clone(),
                    });
                }
            }
        }

        let mut coerced = Map::new();
        for (name, spec) in &self.params {
            if let Some(value) = arguments.get(name) {
                coerced.insert(name.clone(), value.clone());
            } else if let Some(default) = &spec.default {
                coerced.insert(name.clone(), default.clone());
            }
        }
        if self.permissive {
            for (key, value) in arguments {
                if !coerced.contains_key(key) {
                    coerced.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(coerced)
    }

    /// Render the declaration as a JSON Schema object for `tools/list`.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.params {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(spec.param_type.name()));
            if let Some(description) = &spec.description {
                prop.insert("description".to_string(), json!(description));
            }
            if let Some(default) = &spec.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(name.clone(), Value::Object(prop));
            if spec.required {
                required.push(json!(name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance_schema() -> ParamSchema {
        ParamSchema::new()
            .param("instance_id", ParamSpec::required(ParamType::String))
            .param(
                "region",
                ParamSpec::optional(ParamType::String, json!("us-east-1")),
            )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn missing_required_names_the_parameter() {
        let err = instance_schema()
            .validate(&args(json!({"region": "us-east-1"})))
            .unwrap_err();
        match err {
            GatewayError::MissingParameter { parameter } => {
                assert_eq!(parameter, "instance_id")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_key_names_the_key() {
        let err = instance_schema()
            .validate(&args(json!({"instance_id": "i-123", "color": "red"})))
            .unwrap_err();
        match err {
            GatewayError::UnknownParameter { parameter } => assert_eq!(parameter, "color"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_reports_expected_and_actual() {
        let err = instance_schema()
            .validate(&args(json!({"instance_id": 42})))
            .unwrap_err();
        match err {
            GatewayError::TypeMismatch {
                parameter,
                expected,
                actual,
            } => {
                assert_eq!(parameter, "instance_id");
                assert_eq!(expected, "string");
                assert_eq!(actual, "integer");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn defaults_applied_for_absent_optionals() {
        let coerced = instance_schema()
            .validate(&args(json!({"instance_id": "i-123"})))
            .unwrap();
        assert_eq!(coerced.get("instance_id"), Some(&json!("i-123")));
        assert_eq!(coerced.get("region"), Some(&json!("us-east-1")));
    }

    #[test]
    fn explicit_value_wins_over_default() {
        let coerced = instance_schema()
            .validate(&args(
                json!({"instance_id": "i-123", "region": "eu-west-1"}),
            ))
            .unwrap();
        assert_eq!(coerced.get("region"), Some(&json!("eu-west-1")));
    }

    #[test]
    fn permissive_schema_passes_undeclared_keys_through() {
        let schema = instance_schema().permissive();
        let coerced = schema
            .validate(&args(json!({"instance_id": "i-123", "extra": true})))
            .unwrap();
        assert_eq!(coerced.get("extra"), Some(&json!(true)));
    }

    #[test]
    fn json_schema_lists_required_and_defaults() {
        let schema = instance_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["instance_id"]));
        assert_eq!(schema["properties"]["region"]["default"], "us-east-1");
        assert_eq!(schema["properties"]["instance_id"]["type"], "string");
    }
}
