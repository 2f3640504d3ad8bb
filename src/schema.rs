//! Parameter descriptors and JSON Schema derivation
//!
//! Each registered handler carries an explicit list of `ParamSpec`s built at
//! registration time; the input schema shown by `tools/list` and
//! `/openapi.json` is derived from them unless an explicit schema overrides it.

use serde_json::{json, Map, Value};

/// Declared type of a handler parameter. `Any` derives the unconstrained
/// schema `{}` and accepts any JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl ParamType {
    fn to_schema(self) -> Value {
        match self {
            Self::String => json!({"type": "string"}),
            Self::Integer => json!({"type": "integer"}),
            Self::Number => json!({"type": "number"}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::Array => json!({"type": "array"}),
            Self::Object => json!({"type": "object"}),
            Self::Any => json!({}),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
        }
    }

    /// An optional parameter. The default is injected at argument-binding
    /// time when the caller omits it; it never appears in the schema.
    pub fn optional(name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: Some(default),
        }
    }
}

/// Derive a JSON-Schema `object` from a parameter list. Never fails; the
/// worst case is an unconstrained property schema.
pub fn derive_input_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        properties.insert(param.name.clone(), param.ty.to_schema());
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Derive the `arguments` list advertised by `prompts/list`: prompt
/// arguments carry only a name and a required flag.
pub fn derive_prompt_arguments(params: &[ParamSpec]) -> Value {
    Value::Array(
        params
            .iter()
            .map(|param| json!({"name": param.name, "required": param.required}))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_properties_and_required() {
        let params = [
            ParamSpec::required("a", ParamType::Number),
            ParamSpec::optional("precision", ParamType::Integer, json!(10)),
        ];

        let schema = derive_input_schema(&params);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["a"], json!({"type": "number"}));
        assert_eq!(
            schema["properties"]["precision"],
            json!({"type": "integer"})
        );
        assert_eq!(schema["required"], json!(["a"]));
    }

    #[test]
    fn default_values_are_not_injected_into_schema() {
        let params = [ParamSpec::optional("limit", ParamType::Integer, json!(50))];

        let schema = derive_input_schema(&params);
        assert!(schema["properties"]["limit"].get("default").is_none());
        assert_eq!(schema["required"], json!([]));
    }

    #[test]
    fn untyped_parameter_derives_unconstrained_schema() {
        let params = [ParamSpec::required("anything", ParamType::Any)];

        let schema = derive_input_schema(&params);
        assert_eq!(schema["properties"]["anything"], json!({}));
    }

    #[test]
    fn empty_parameter_list_derives_empty_object_schema() {
        let schema = derive_input_schema(&[]);
        assert_eq!(
            schema,
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn prompt_arguments_carry_name_and_required_only() {
        let params = [
            ParamSpec::required("expression", ParamType::String),
            ParamSpec::optional("style", ParamType::String, json!("plain")),
        ];

        let arguments = derive_prompt_arguments(&params);
        assert_eq!(
            arguments,
            json!([
                {"name": "expression", "required": true},
                {"name": "style", "required": false}
            ])
        );
    }
}
