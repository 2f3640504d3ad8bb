use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure raised inside a registered handler. For tools this becomes an
/// `isError: true` result envelope; for resources and prompts it becomes a
/// JSON-RPC error; on the direct REST path it becomes HTTP 500.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced on the direct (non-JSON-RPC) HTTP paths.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },
    #[error("bad request: {message}")]
    BadRequest { message: &'static str },
    #[error("{0}")]
    Handler(#[from] HandlerError),
}

impl AppError {
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Tool",
            key: name.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Handler(err) => {
                tracing::error!(error = %err, "handler failed on direct call");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
