//! Capability registry: tool, resource and prompt definitions
//!
//! Definitions are built once at startup through the builders below and are
//! immutable afterwards; the registry is shared behind an `Arc` and read
//! without locking while the server runs.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::context::Context;
use crate::errors::HandlerError;
use crate::mcp::content::{PromptReturn, ResourceReturn, ToolReturn};
use crate::schema::{derive_input_schema, derive_prompt_arguments, ParamSpec};

pub type JsonMap = Map<String, Value>;

pub type ToolHandler =
    Arc<dyn Fn(&JsonMap, Option<&Context>) -> Result<ToolReturn, HandlerError> + Send + Sync>;
pub type ResourceHandler =
    Arc<dyn Fn(Option<&Context>) -> Result<ResourceReturn, HandlerError> + Send + Sync>;
pub type PromptHandler =
    Arc<dyn Fn(&JsonMap, Option<&Context>) -> Result<PromptReturn, HandlerError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate {category} registration: {key}")]
    Duplicate { category: &'static str, key: String },
}

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub input_schema: Value,
    pub tags: BTreeSet<String>,
    pub meta: JsonMap,
    pub wants_context: bool,
    pub handler: ToolHandler,
}

impl ToolDefinition {
    /// Wire shape of a `tools/list` entry.
    pub fn list_entry(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

#[derive(Clone)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: Option<String>,
    pub tags: BTreeSet<String>,
    pub meta: JsonMap,
    pub wants_context: bool,
    pub handler: ResourceHandler,
}

impl ResourceDefinition {
    pub fn list_entry(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("uri".to_string(), json!(self.uri));
        entry.insert("name".to_string(), json!(self.name));
        if !self.description.is_empty() {
            entry.insert("description".to_string(), json!(self.description));
        }
        if let Some(mime_type) = &self.mime_type {
            entry.insert("mimeType".to_string(), json!(mime_type));
        }
        Value::Object(entry)
    }
}

#[derive(Clone)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub tags: BTreeSet<String>,
    pub meta: JsonMap,
    pub wants_context: bool,
    pub handler: PromptHandler,
}

impl PromptDefinition {
    pub fn list_entry(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("name".to_string(), json!(self.name));
        if !self.description.is_empty() {
            entry.insert("description".to_string(), json!(self.description));
        }
        if !self.params.is_empty() {
            entry.insert("arguments".to_string(), derive_prompt_arguments(&self.params));
        }
        Value::Object(entry)
    }
}

pub struct ToolBuilder {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    input_schema: Option<Value>,
    tags: BTreeSet<String>,
    meta: JsonMap,
    wants_context: bool,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            input_schema: None,
            tags: BTreeSet::new(),
            meta: Map::new(),
            wants_context: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Explicit schema fully overrides derivation, no merge.
    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn wants_context(mut self) -> Self {
        self.wants_context = true;
        self
    }

    pub fn handler<F>(self, handler: F) -> ToolDefinition
    where
        F: Fn(&JsonMap, Option<&Context>) -> Result<ToolReturn, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let input_schema = self
            .input_schema
            .unwrap_or_else(|| derive_input_schema(&self.params));
        ToolDefinition {
            name: self.name,
            description: self.description,
            params: self.params,
            input_schema,
            tags: self.tags,
            meta: self.meta,
            wants_context: self.wants_context,
            handler: Arc::new(handler),
        }
    }
}

pub struct ResourceBuilder {
    uri: String,
    name: String,
    description: String,
    mime_type: Option<String>,
    tags: BTreeSet<String>,
    meta: JsonMap,
    wants_context: bool,
}

impl ResourceBuilder {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: String::new(),
            mime_type: None,
            tags: BTreeSet::new(),
            meta: Map::new(),
            wants_context: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn wants_context(mut self) -> Self {
        self.wants_context = true;
        self
    }

    pub fn handler<F>(self, handler: F) -> ResourceDefinition
    where
        F: Fn(Option<&Context>) -> Result<ResourceReturn, HandlerError> + Send + Sync + 'static,
    {
        ResourceDefinition {
            uri: self.uri,
            name: self.name,
            description: self.description,
            mime_type: self.mime_type,
            tags: self.tags,
            meta: self.meta,
            wants_context: self.wants_context,
            handler: Arc::new(handler),
        }
    }
}

pub struct PromptBuilder {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    tags: BTreeSet<String>,
    meta: JsonMap,
    wants_context: bool,
}

impl PromptBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            tags: BTreeSet::new(),
            meta: Map::new(),
            wants_context: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn wants_context(mut self) -> Self {
        self.wants_context = true;
        self
    }

    pub fn handler<F>(self, handler: F) -> PromptDefinition
    where
        F: Fn(&JsonMap, Option<&Context>) -> Result<PromptReturn, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        PromptDefinition {
            name: self.name,
            description: self.description,
            params: self.params,
            tags: self.tags,
            meta: self.meta,
            wants_context: self.wants_context,
            handler: Arc::new(handler),
        }
    }
}

/// Insertion-ordered definition store. Populated exclusively before the
/// server accepts traffic; `tools/list` output order is registration order.
#[derive(Default)]
pub struct Registry {
    tools: Vec<ToolDefinition>,
    resources: Vec<ResourceDefinition>,
    prompts: Vec<PromptDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, definition: ToolDefinition) -> Result<(), RegistryError> {
        if self.tool(&definition.name).is_some() {
            return Err(RegistryError::Duplicate {
                category: "tool",
                key: definition.name,
            });
        }
        self.tools.push(definition);
        Ok(())
    }

    pub fn register_resource(
        &mut self,
        definition: ResourceDefinition,
    ) -> Result<(), RegistryError> {
        if self.resource(&definition.uri).is_some() {
            return Err(RegistryError::Duplicate {
                category: "resource",
                key: definition.uri,
            });
        }
        self.resources.push(definition);
        Ok(())
    }

    pub fn register_prompt(&mut self, definition: PromptDefinition) -> Result<(), RegistryError> {
        if self.prompt(&definition.name).is_some() {
            return Err(RegistryError::Duplicate {
                category: "prompt",
                key: definition.name,
            });
        }
        self.prompts.push(definition);
        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|resource| resource.uri == uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.iter().find(|prompt| prompt.name == name)
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    pub fn prompts(&self) -> &[PromptDefinition] {
        &self.prompts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamType;
    use serde_json::json;

    fn echo_tool(name: &str) -> ToolDefinition {
        ToolBuilder::new(name)
            .description("echo")
            .param(ParamSpec::required("text", ParamType::String))
            .handler(|args, _ctx| Ok(args.get("text").cloned().unwrap_or(Value::Null).into()))
    }

    #[test]
    fn duplicate_tool_registration_fails() {
        let mut registry = Registry::new();
        registry.register_tool(echo_tool("echo")).expect("first registration");

        let err = registry
            .register_tool(echo_tool("echo"))
            .expect_err("duplicate must fail");
        assert!(err.to_string().contains("duplicate tool"));
    }

    #[test]
    fn tools_preserve_registration_order() {
        let mut registry = Registry::new();
        registry.register_tool(echo_tool("zeta")).expect("register zeta");
        registry.register_tool(echo_tool("alpha")).expect("register alpha");
        registry.register_tool(echo_tool("mid")).expect("register mid");

        let names: Vec<&str> = registry.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn explicit_input_schema_overrides_derivation() {
        let schema = json!({"type": "object", "properties": {"x": {"type": "string"}}});
        let tool = ToolBuilder::new("custom")
            .param(ParamSpec::required("ignored", ParamType::Number))
            .input_schema(schema.clone())
            .handler(|_args, _ctx| Ok(json!(null).into()));

        assert_eq!(tool.input_schema, schema);
    }

    #[test]
    fn resource_list_entry_omits_empty_optionals() {
        let resource = ResourceBuilder::new("config://settings", "Settings")
            .handler(|_ctx| Ok(json!({}).into()));

        let entry = resource.list_entry();
        assert_eq!(entry["uri"], "config://settings");
        assert!(entry.get("description").is_none());
        assert!(entry.get("mimeType").is_none());
    }

    #[test]
    fn prompt_list_entry_includes_arguments() {
        let prompt = PromptBuilder::new("calculate")
            .description("Generate a calculation prompt")
            .param(ParamSpec::required("expression", ParamType::String))
            .handler(|_args, _ctx| Ok(PromptReturn::Text("hi".to_string())));

        let entry = prompt.list_entry();
        assert_eq!(entry["arguments"][0]["name"], "expression");
        assert_eq!(entry["arguments"][0]["required"], true);
    }
}
