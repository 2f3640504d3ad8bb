//! Protocol content envelopes and result normalization
//!
//! Handlers may return plain JSON values; normalization maps them onto the
//! protocol's content envelopes. Pre-built envelopes pass through verbatim so
//! handlers keep full control when they need it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::HandlerError;

/// A single content block inside a tool result or prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    pub text: String,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReadResult {
    pub contents: Vec<ResourceContent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: ContentBlock,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: ContentBlock::text(text),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: ContentBlock::text(text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResult {
    pub messages: Vec<PromptMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What a tool handler may hand back to the dispatcher.
#[derive(Debug, Clone)]
pub enum ToolReturn {
    Value(Value),
    Wrapped(ToolCallResult),
}

impl From<Value> for ToolReturn {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ToolCallResult> for ToolReturn {
    fn from(result: ToolCallResult) -> Self {
        Self::Wrapped(result)
    }
}

#[derive(Debug, Clone)]
pub enum ResourceReturn {
    Value(Value),
    Wrapped(ResourceReadResult),
}

impl From<Value> for ResourceReturn {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ResourceReadResult> for ResourceReturn {
    fn from(result: ResourceReadResult) -> Self {
        Self::Wrapped(result)
    }
}

#[derive(Debug, Clone)]
pub enum PromptReturn {
    Text(String),
    Messages(Vec<PromptMessage>),
    Wrapped(PromptResult),
}

impl From<String> for PromptReturn {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<PromptMessage>> for PromptReturn {
    fn from(messages: Vec<PromptMessage>) -> Self {
        Self::Messages(messages)
    }
}

/// Text representation of a handler value: strings pass through unquoted,
/// structured values and remaining scalars use their canonical JSON
/// rendering.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn normalize_tool_return(outcome: Result<ToolReturn, HandlerError>) -> ToolCallResult {
    match outcome {
        Ok(ToolReturn::Wrapped(result)) => result,
        Ok(ToolReturn::Value(value)) => ToolCallResult::text(stringify_value(&value)),
        Err(err) => ToolCallResult::error(err.to_string()),
    }
}

/// Normalize a successful resource read. Handler errors stay JSON-RPC errors
/// for resources, so only the success shape is mapped here.
pub fn normalize_resource_return(uri: &str, value: ResourceReturn) -> ResourceReadResult {
    match value {
        ResourceReturn::Wrapped(result) => result,
        ResourceReturn::Value(value) => {
            let text = stringify_value(&value);
            ResourceReadResult {
                contents: vec![ResourceContent {
                    uri: uri.to_string(),
                    text,
                    mime_type: None,
                }],
            }
        }
    }
}

pub fn normalize_prompt_return(value: PromptReturn) -> PromptResult {
    match value {
        PromptReturn::Wrapped(result) => result,
        PromptReturn::Messages(messages) => PromptResult {
            messages,
            description: None,
        },
        PromptReturn::Text(text) => PromptResult {
            messages: vec![PromptMessage::user(text)],
            description: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_tool_value_becomes_text_block() {
        let result = normalize_tool_return(Ok(ToolReturn::Value(json!(5.0))));
        assert!(!result.is_error);
        assert!(matches!(&result.content[0], ContentBlock::Text { text } if text == "5.0"));
    }

    #[test]
    fn string_tool_value_is_not_quoted() {
        let result = normalize_tool_return(Ok(ToolReturn::Value(json!("hello"))));
        assert!(matches!(&result.content[0], ContentBlock::Text { text } if text == "hello"));
    }

    #[test]
    fn mapping_tool_value_becomes_json_text() {
        let result = normalize_tool_return(Ok(ToolReturn::Value(json!({"sum": 5}))));
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text block");
        };
        assert_eq!(
            serde_json::from_str::<Value>(text).expect("valid json"),
            json!({"sum": 5})
        );
    }

    #[test]
    fn wrapped_tool_result_passes_through_verbatim() {
        let wrapped = ToolCallResult {
            content: vec![ContentBlock::text("prebuilt"), ContentBlock::text("blocks")],
            is_error: false,
        };
        let result = normalize_tool_return(Ok(ToolReturn::Wrapped(wrapped)));
        assert_eq!(result.content.len(), 2);
    }

    #[test]
    fn handler_error_becomes_is_error_result() {
        let result = normalize_tool_return(Err(HandlerError::new("Cannot divide by zero")));
        assert!(result.is_error);
        assert!(
            matches!(&result.content[0], ContentBlock::Text { text } if text == "Cannot divide by zero")
        );
    }

    #[test]
    fn image_block_serializes_with_wire_field_names() {
        let block = ContentBlock::Image {
            data: "aGVsbG8=".to_string(),
            mime_type: "image/png".to_string(),
        };
        let value = serde_json::to_value(&block).expect("serialize image block");
        assert_eq!(
            value,
            json!({"type": "image", "data": "aGVsbG8=", "mimeType": "image/png"})
        );
    }

    #[test]
    fn wrapped_resource_result_passes_through_verbatim() {
        let wrapped = ResourceReadResult {
            contents: vec![
                ResourceContent {
                    uri: "doc://part/one".to_string(),
                    text: "first".to_string(),
                    mime_type: Some("text/plain".to_string()),
                },
                ResourceContent {
                    uri: "doc://part/two".to_string(),
                    text: "second".to_string(),
                    mime_type: None,
                },
            ],
        };

        let result =
            normalize_resource_return("doc://requested", ResourceReturn::Wrapped(wrapped));
        assert_eq!(result.contents.len(), 2);
        assert_eq!(result.contents[0].uri, "doc://part/one");
        assert_eq!(result.contents[1].text, "second");
    }

    #[test]
    fn wrapped_prompt_result_passes_through_verbatim() {
        let wrapped = PromptResult {
            messages: vec![PromptMessage::assistant("ready")],
            description: Some("status prompt".to_string()),
        };

        let result = normalize_prompt_return(PromptReturn::Wrapped(wrapped));
        assert_eq!(result.description.as_deref(), Some("status prompt"));
        assert_eq!(result.messages[0].role, Role::Assistant);
    }

    #[test]
    fn resource_mapping_round_trips_through_json_text() {
        let result =
            normalize_resource_return("config://settings", json!({"precision": 10}).into());
        assert_eq!(result.contents[0].uri, "config://settings");
        let decoded: Value =
            serde_json::from_str(&result.contents[0].text).expect("valid resource json");
        assert_eq!(decoded, json!({"precision": 10}));
    }

    #[test]
    fn resource_string_passes_through_unchanged() {
        let result = normalize_resource_return("doc://readme", json!("plain text").into());
        assert_eq!(result.contents[0].text, "plain text");
    }

    #[test]
    fn bare_prompt_string_wraps_as_user_message() {
        let result = normalize_prompt_return(PromptReturn::Text("Explain SSE".to_string()));
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, Role::User);
    }

    #[test]
    fn prompt_message_list_is_used_directly() {
        let messages = vec![
            PromptMessage::user("Review this"),
            PromptMessage::assistant("Looking now"),
        ];
        let result = normalize_prompt_return(PromptReturn::Messages(messages));
        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[1].role, Role::Assistant);
    }
}
