//! Axum HTTP handlers for both transports
//!
//! POST endpoints feed the JSON-RPC dispatcher and mirror every produced
//! response to the broadcast hub; GET endpoints open event streams or serve
//! the derived discovery documents.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde_json::{json, Map, Value};
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream, StreamExt};

use crate::errors::{AppError, HandlerError};
use crate::hub::StreamHub;
use crate::mcp::content::{stringify_value, ToolReturn};
use crate::mcp::rpc::{json_rpc_error, INTERNAL_ERROR, INVALID_REQUEST, PARSE_ERROR};
use crate::mcp::server::{call_tool, capabilities, handle_json_rpc_value, PROTOCOL_VERSION};
use crate::AppState;

/// Synchronous JSON-RPC endpoint (`POST /` and `POST /mcp`). Every response
/// envelope is also broadcast to all open streams; the synchronous caller
/// receives the exact bytes that were broadcast.
pub async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response()
        }
    };

    if let Some(batch) = payload.as_array() {
        if batch.is_empty() {
            return (
                StatusCode::OK,
                Json(vec![json_rpc_error(None, INVALID_REQUEST, "Invalid Request")]),
            )
                .into_response();
        }

        let mut responses = Vec::new();
        for item in batch {
            if let Some(response) = dispatch(state.clone(), item.clone()).await {
                state.hub.broadcast(&response);
                responses.push(response);
            }
        }

        if responses.is_empty() {
            return accepted();
        }

        return (StatusCode::OK, Json(Value::Array(responses))).into_response();
    }

    match dispatch(state.clone(), payload).await {
        Some(response) => {
            let serialized = response.to_string();
            state.hub.broadcast_raw(&serialized);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                serialized,
            )
                .into_response()
        }
        None => accepted(),
    }
}

fn accepted() -> Response {
    (StatusCode::ACCEPTED, Json(json!({"status": "accepted"}))).into_response()
}

/// Run the dispatcher on the blocking pool. Handlers are synchronous, so a
/// slow one must only delay its own request, never starve the runtime's
/// worker threads and the other connections scheduled on them.
async fn dispatch(state: AppState, payload: Value) -> Option<Value> {
    let id = payload.get("id").cloned().filter(|id| !id.is_null());
    match tokio::task::spawn_blocking(move || handle_json_rpc_value(&state, payload)).await {
        Ok(response) => response,
        Err(_) => id
            .is_some()
            .then(|| json_rpc_error(id, INTERNAL_ERROR, "Internal error")),
    }
}

/// Bare event stream (`GET /sse`): an `open` event, then every broadcast as
/// a `message` event.
pub async fn sse_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    event_stream(&state.hub, Event::default().event("open").data("{}"))
}

/// Combined stream (`GET /mcp`): identical to `/sse` after the opening
/// `endpoint` event naming its POST path.
pub async fn mcp_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let endpoint = match state.path_prefix.as_deref() {
        Some(prefix) => format!("{prefix}/mcp"),
        None => "/mcp".to_string(),
    };
    event_stream(&state.hub, Event::default().event("endpoint").data(endpoint))
}

fn event_stream(
    hub: &StreamHub,
    opening: Event,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = hub.subscribe();
    let messages = UnboundedReceiverStream::new(receiver)
        .map(|payload| Ok(Event::default().event("message").data(payload)));
    let stream = tokio_stream::once(Ok(opening)).chain(messages);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Direct REST-style invocation (`POST /tools/{name}`): the body is the
/// argument map, no JSON-RPC envelope. Unknown names are 404, handler
/// failures 500.
pub async fn direct_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let tool = state
        .registry
        .tool(&name)
        .ok_or_else(|| AppError::tool_not_found(&name))?
        .clone();

    let arguments = if body.is_empty() {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err(AppError::BadRequest {
                    message: "request body must be a JSON object of arguments",
                })
            }
        }
    };

    let handler_state = state.clone();
    let returned =
        tokio::task::spawn_blocking(move || call_tool(&handler_state, &tool, &arguments, None))
            .await
            .map_err(|_| HandlerError::new("tool handler panicked"))??;

    let result = match returned {
        ToolReturn::Value(Value::Object(map)) => Value::Object(map),
        ToolReturn::Value(value) => json!({ "result": stringify_value(&value) }),
        ToolReturn::Wrapped(wrapped) => {
            serde_json::to_value(wrapped).expect("tool result serialization")
        }
    };

    Ok(Json(result).into_response())
}

/// Read-only OpenAPI 3.1 document: the JSON-RPC endpoint plus one POST path
/// per tool with its input schema as the request-body schema.
pub async fn openapi_document(State(state): State<AppState>) -> Json<Value> {
    let mut paths = Map::new();
    paths.insert(
        "/mcp".to_string(),
        json!({
            "get": {
                "operationId": "mcp_sse",
                "summary": "MCP streamable HTTP SSE endpoint",
                "responses": {"200": {"description": "SSE stream"}}
            },
            "post": {
                "operationId": "mcp_message",
                "summary": "Send MCP JSON-RPC message",
                "requestBody": {
                    "content": {"application/json": {"schema": {"type": "object"}}}
                },
                "responses": {"200": {"description": "JSON-RPC response"}}
            }
        }),
    );

    for tool in state.registry.tools() {
        paths.insert(
            format!("/tools/{}", tool.name),
            json!({
                "post": {
                    "operationId": tool.name,
                    "summary": tool.description,
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {"schema": tool.input_schema}
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Tool result",
                            "content": {
                                "application/json": {"schema": {"type": "object"}}
                            }
                        }
                    }
                }
            }),
        );
    }

    Json(json!({
        "openapi": "3.1.0",
        "info": {
            "title": state.name.as_ref(),
            "version": state.version.as_ref(),
            "description": "MCP server exposing tools as OpenAPI endpoints"
        },
        "paths": paths
    }))
}

/// Discovery document (`GET /.well-known/mcp.json`).
pub async fn discovery_document(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "mcpVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": state.name.as_ref(),
            "version": state.version.as_ref(),
        },
        "capabilities": capabilities(),
        "transports": [
            {"type": "sse", "endpoint": "/sse"},
            {"type": "streamable-http", "endpoint": "/mcp"}
        ]
    }))
}

/// Human-facing summary (`GET /`).
pub async fn server_summary(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.name.as_ref(),
        "version": state.version.as_ref(),
        "status": "running",
        "tools": state.registry.tools().len(),
        "resources": state.registry.resources().len(),
        "prompts": state.registry.prompts().len(),
        "endpoints": {
            "sse": "/sse",
            "mcp": "/mcp",
            "openapi": "/openapi.json"
        }
    }))
}
