//! The JSON-RPC dispatcher
//!
//! Classifies inbound messages, routes them to registry entries, binds
//! arguments, invokes handlers and maps outcomes to response envelopes.
//! A message with an `id` yields exactly one correlated response; a message
//! without one is processed for side effects only.

use serde_json::{json, Map, Value};
use tracing::info;

use crate::context::Context;
use crate::errors::HandlerError;
use crate::mcp::content::{normalize_prompt_return, normalize_resource_return, normalize_tool_return, ToolReturn};
use crate::mcp::rpc::{
    is_json_rpc_error, json_rpc_error, json_rpc_result, JsonRpcEnvelope, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
};
use crate::registry::{JsonMap, ToolDefinition};
use crate::schema::ParamSpec;
use crate::AppState;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Capability set advertised by `initialize` and the discovery document.
pub fn capabilities() -> Value {
    json!({
        "tools": {},
        "resources": {},
        "prompts": {},
        "logging": {}
    })
}

/// Handle one decoded JSON-RPC message. Returns `None` for notifications,
/// which never produce a response envelope.
pub fn handle_json_rpc_value(state: &AppState, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
    }

    let raw_id = payload.get("id").cloned().filter(|id| !id.is_null());
    let envelope: JsonRpcEnvelope = match serde_json::from_value(payload) {
        Ok(envelope) => envelope,
        Err(_) => {
            return raw_id
                .is_some()
                .then(|| json_rpc_error(raw_id, INVALID_REQUEST, "Invalid Request"))
        }
    };

    let id = envelope.id.filter(|id| !id.is_null());
    if envelope.jsonrpc != "2.0" || envelope.method.trim().is_empty() {
        return id
            .is_some()
            .then(|| json_rpc_error(id, INVALID_REQUEST, "Invalid Request"));
    }

    let response = handle_json_rpc_request(state, id.clone(), &envelope.method, envelope.params);
    if id.is_some() {
        Some(response)
    } else {
        None
    }
}

fn handle_json_rpc_request(
    state: &AppState,
    id: Option<Value>,
    method: &str,
    params: Option<Value>,
) -> Value {
    let params = match params {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    let response = match method {
        "initialize" => json_rpc_result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": state.name.as_ref(),
                    "version": state.version.as_ref(),
                },
                "capabilities": capabilities(),
            }),
        ),
        // Client lifecycle notification; answered with an empty result only
        // when the client attached an id.
        "initialized" | "notifications/initialized" => json_rpc_result(id, json!({})),
        "ping" => json_rpc_result(id, json!({})),
        "tools/list" => json_rpc_result(
            id,
            json!({
                "tools": state
                    .registry
                    .tools()
                    .iter()
                    .map(|tool| tool.list_entry())
                    .collect::<Vec<_>>()
            }),
        ),
        "tools/call" => handle_tools_call(state, id, &params),
        "resources/list" => json_rpc_result(
            id,
            json!({
                "resources": state
                    .registry
                    .resources()
                    .iter()
                    .map(|resource| resource.list_entry())
                    .collect::<Vec<_>>()
            }),
        ),
        "resources/read" => handle_resources_read(state, id, &params),
        "prompts/list" => json_rpc_result(
            id,
            json!({
                "prompts": state
                    .registry
                    .prompts()
                    .iter()
                    .map(|prompt| prompt.list_entry())
                    .collect::<Vec<_>>()
            }),
        ),
        "prompts/get" => handle_prompts_get(state, id, &params),
        other => json_rpc_error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };

    info!(
        method = %method,
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        "rpc message handled"
    );

    response
}

/// Match caller-supplied arguments against the declared parameter list:
/// declared defaults fill absent optionals, missing required parameters and
/// undeclared names are invocation errors.
fn bind_arguments(params: &[ParamSpec], supplied: &JsonMap) -> Result<JsonMap, HandlerError> {
    let mut bound = Map::new();

    for param in params {
        match supplied.get(&param.name) {
            Some(value) => {
                bound.insert(param.name.clone(), value.clone());
            }
            None if param.required => {
                return Err(HandlerError::new(format!(
                    "missing required argument: {}",
                    param.name
                )));
            }
            None => {
                if let Some(default) = &param.default {
                    bound.insert(param.name.clone(), default.clone());
                }
            }
        }
    }

    for name in supplied.keys() {
        if !params.iter().any(|param| param.name == *name) {
            return Err(HandlerError::new(format!("unexpected argument: {name}")));
        }
    }

    Ok(bound)
}

/// Bind arguments and invoke a tool handler, constructing a per-call
/// Context when the definition asks for one. Shared by the JSON-RPC and
/// direct REST paths.
pub fn call_tool(
    state: &AppState,
    tool: &ToolDefinition,
    arguments: &JsonMap,
    request_id: Option<Value>,
) -> Result<ToolReturn, HandlerError> {
    let bound = bind_arguments(&tool.params, arguments)?;
    if tool.wants_context {
        let ctx = Context::new(request_id, state.hub.clone());
        (tool.handler)(&bound, Some(&ctx))
    } else {
        (tool.handler)(&bound, None)
    }
}

fn handle_tools_call(state: &AppState, id: Option<Value>, params: &JsonMap) -> Value {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };
    let arguments = match params.get("arguments") {
        None => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    let Some(tool) = state.registry.tool(name) else {
        return json_rpc_error(id, METHOD_NOT_FOUND, format!("Tool not found: {name}"));
    };

    // Handler failures are successful results with isError set, never
    // transport errors; the session stays alive.
    let outcome = call_tool(state, tool, &arguments, id.clone());
    let result = normalize_tool_return(outcome);
    json_rpc_result(
        id,
        serde_json::to_value(result).expect("tool result serialization"),
    )
}

fn handle_resources_read(state: &AppState, id: Option<Value>, params: &JsonMap) -> Value {
    let Some(uri) = params.get("uri").and_then(Value::as_str) else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let Some(resource) = state.registry.resource(uri) else {
        return json_rpc_error(id, METHOD_NOT_FOUND, format!("Resource not found: {uri}"));
    };

    let outcome = if resource.wants_context {
        let ctx = Context::new(id.clone(), state.hub.clone());
        (resource.handler)(Some(&ctx))
    } else {
        (resource.handler)(None)
    };

    match outcome {
        Ok(value) => {
            let result = normalize_resource_return(uri, value);
            json_rpc_result(
                id,
                serde_json::to_value(result).expect("resource result serialization"),
            )
        }
        // No content-envelope convention for resource failures.
        Err(err) => json_rpc_error(id, INTERNAL_ERROR, err.to_string()),
    }
}

fn handle_prompts_get(state: &AppState, id: Option<Value>, params: &JsonMap) -> Value {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };
    let arguments = match params.get("arguments") {
        None => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    let Some(prompt) = state.registry.prompt(name) else {
        return json_rpc_error(id, METHOD_NOT_FOUND, format!("Prompt not found: {name}"));
    };

    let outcome = bind_arguments(&prompt.params, &arguments).and_then(|bound| {
        if prompt.wants_context {
            let ctx = Context::new(id.clone(), state.hub.clone());
            (prompt.handler)(&bound, Some(&ctx))
        } else {
            (prompt.handler)(&bound, None)
        }
    });

    match outcome {
        Ok(value) => {
            let result = normalize_prompt_return(value);
            json_rpc_result(
                id,
                serde_json::to_value(result).expect("prompt result serialization"),
            )
        }
        Err(err) => json_rpc_error(id, INTERNAL_ERROR, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamType;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("a", ParamType::Number),
            ParamSpec::optional("precision", ParamType::Integer, json!(10)),
        ]
    }

    fn map(value: Value) -> JsonMap {
        value.as_object().expect("object literal").clone()
    }

    #[test]
    fn binding_injects_default_for_absent_optional() {
        let bound = bind_arguments(&specs(), &map(json!({"a": 1}))).expect("binding");
        assert_eq!(bound.get("a"), Some(&json!(1)));
        assert_eq!(bound.get("precision"), Some(&json!(10)));
    }

    #[test]
    fn binding_prefers_supplied_value_over_default() {
        let bound =
            bind_arguments(&specs(), &map(json!({"a": 1, "precision": 2}))).expect("binding");
        assert_eq!(bound.get("precision"), Some(&json!(2)));
    }

    #[test]
    fn binding_rejects_missing_required_argument() {
        let err = bind_arguments(&specs(), &map(json!({}))).expect_err("missing required");
        assert!(err.to_string().contains("missing required argument: a"));
    }

    #[test]
    fn binding_rejects_undeclared_argument() {
        let err = bind_arguments(&specs(), &map(json!({"a": 1, "bogus": true})))
            .expect_err("unexpected argument");
        assert!(err.to_string().contains("unexpected argument: bogus"));
    }

    #[test]
    fn capabilities_are_fixed() {
        let caps = capabilities();
        for key in ["tools", "resources", "prompts", "logging"] {
            assert!(caps[key].is_object(), "missing capability: {key}");
        }
    }
}
