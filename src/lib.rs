//! Embeddable MCP server engine
//!
//! Register tools, resources and prompts on a [`Registry`], wrap it in an
//! [`AppState`] and serve the resulting router: JSON-RPC 2.0 over `POST /`
//! and `POST /mcp`, event streams over `GET /sse` and `GET /mcp`, plus
//! direct REST tool calls and derived discovery documents.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub mod config;
pub mod context;
pub mod errors;
pub mod http;
pub mod hub;
pub mod logging;
pub mod mcp;
pub mod registry;
pub mod schema;

pub use context::Context;
pub use errors::{AppError, HandlerError};
pub use hub::StreamHub;
pub use mcp::content::{
    ContentBlock, PromptMessage, PromptResult, PromptReturn, ResourceContent, ResourceReadResult,
    ResourceReturn, Role, ToolCallResult, ToolReturn,
};
pub use registry::{
    PromptBuilder, PromptDefinition, Registry, RegistryError, ResourceBuilder, ResourceDefinition,
    ToolBuilder, ToolDefinition,
};
pub use schema::{ParamSpec, ParamType};

#[derive(Clone)]
pub struct AppState {
    pub name: Arc<str>,
    pub version: Arc<str>,
    pub registry: Arc<registry::Registry>,
    pub hub: StreamHub,
    pub path_prefix: Option<Arc<str>>,
}

impl AppState {
    /// Freeze a populated registry and prepare it for serving. No further
    /// registration is possible once the registry is wrapped here.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        registry: registry::Registry,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            version: Arc::from(version.into()),
            registry: Arc::new(registry),
            hub: StreamHub::new(),
            path_prefix: None,
        }
    }

    /// Deployment path prefix under which every route is additionally
    /// served, for reverse-proxied hosts. Normalized to a leading slash and
    /// no trailing slash, so `"weber/x/"` and `"/weber/x"` are equivalent;
    /// an empty or root prefix clears it.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        let normalized = config::normalize_prefix(&prefix.into());
        self.path_prefix = if normalized.is_empty() {
            None
        } else {
            Some(Arc::from(normalized))
        };
        self
    }
}

pub fn build_app(state: AppState) -> Router {
    let routes = Router::new()
        .route(
            "/",
            get(http::handlers::server_summary).post(http::handlers::mcp_endpoint),
        )
        .route(
            "/mcp",
            get(http::handlers::mcp_stream).post(http::handlers::mcp_endpoint),
        )
        .route("/sse", get(http::handlers::sse_stream))
        .route("/tools/{name}", post(http::handlers::direct_tool_call))
        .route("/openapi.json", get(http::handlers::openapi_document))
        .route(
            "/.well-known/mcp.json",
            get(http::handlers::discovery_document),
        );

    // Reverse-proxied deployments reach the server under a path prefix; the
    // same routes stay reachable unprefixed for direct access.
    let routes = match state
        .path_prefix
        .as_deref()
        .filter(|prefix| !prefix.is_empty() && *prefix != "/")
    {
        Some(prefix) => Router::new().nest(prefix, routes.clone()).merge(routes),
        None => routes,
    };

    routes
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
