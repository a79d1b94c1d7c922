// MCP Server
//
// This module implements the MCP (Model Context Protocol) JSON-RPC dispatch
// shared by both transports, and the HTTP transport using axum.

use super::handlers::ToolHandler;
use super::protocol::{
    error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
};
use crate::suggest::LibrarySuggester;
use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name reported in `initialize` and `/health`
pub const SERVER_NAME: &str = "lesuggestion";

/// State shared by every request
pub struct McpState {
    suggester: LibrarySuggester,
    handlers: Vec<ToolHandler>,
}

impl McpState {
    /// Create state exposing every tool over `suggester`
    pub fn new(suggester: LibrarySuggester) -> Self {
        Self {
            suggester,
            handlers: ToolHandler::all(),
        }
    }

    /// The suggester tools run against
    pub fn suggester(&self) -> &LibrarySuggester {
        &self.suggester
    }

    /// Registered tool handlers
    pub fn handlers(&self) -> &[ToolHandler] {
        &self.handlers
    }
}

/// MCP Server configuration
#[derive(Clone, Debug)]
pub struct McpServerConfig {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Whether to enable CORS for all origins
    pub enable_cors: bool,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], crate::config::DEFAULT_PORT)),
            enable_cors: true,
        }
    }
}

/// MCP HTTP server
pub struct McpServer {
    /// Configuration for the server
    pub config: McpServerConfig,
    state: Arc<McpState>,
}

impl McpServer {
    /// Create a new MCP server instance
    ///
    /// # Example
    ///
    /// ```ignore
    /// let suggester = LibrarySuggester::new(Arc::new(store));
    /// let server = McpServer::new(McpServerConfig::default(), suggester);
    /// server.run().await?;
    /// ```
    pub fn new(config: McpServerConfig, suggester: LibrarySuggester) -> Self {
        info!("MCP server initialized");
        Self {
            config,
            state: Arc::new(McpState::new(suggester)),
        }
    }

    /// Create MCP server bound to `bind_address`
    pub fn with_address(bind_address: SocketAddr, suggester: LibrarySuggester) -> Self {
        let config = McpServerConfig {
            bind_address,
            ..Default::default()
        };
        Self::new(config, suggester)
    }

    /// Run the MCP server
    ///
    /// Starts the axum HTTP server and handles incoming requests.
    /// This function will block until the server is shut down.
    pub async fn run(self) -> anyhow::Result<()> {
        let bind_address = self.config.bind_address;
        let router = self.router();

        info!("Starting MCP server on {}", bind_address);

        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", bind_address))?;

        axum::serve(listener, router).await.context("Server error")?;

        Ok(())
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/mcp", post(json_rpc_handler))
            .route("/mcp/tools/list", get(list_tools_handler))
            .route("/health", get(health_check_handler));

        let router = if self.config.enable_cors {
            router.layer(tower_http::cors::CorsLayer::very_permissive())
        } else {
            router
        };

        router
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }
}

/// Parse and dispatch one raw JSON-RPC message
///
/// Returns `None` for notifications (requests without an `id`).
pub async fn handle_message(state: &McpState, payload: &str) -> Option<JsonRpcResponse> {
    match serde_json::from_str::<JsonRpcRequest>(payload) {
        Ok(request) => handle_request(state, request).await,
        Err(e) => {
            warn!("Failed to parse JSON-RPC request: {}", e);
            Some(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::parse_error(e.to_string()),
            ))
        }
    }
}

/// Dispatch a parsed JSON-RPC request
///
/// Returns `None` for notifications.
pub async fn handle_request(state: &McpState, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    debug!("Received JSON-RPC request: method={}", request.method);
    let id = request.id.clone();
    let is_notification = request.is_notification();

    if let Err(e) = request.validate() {
        warn!("Invalid JSON-RPC request: {}", e);
        return (!is_notification).then(|| JsonRpcResponse::error(id, e));
    }

    let result = match request.method.as_str() {
        "initialize" => Ok(initialize_result()),
        "notifications/initialized" => Ok(serde_json::json!({})),
        "tools/list" => Ok(list_tools_json(state.handlers())),
        "tools/call" => handle_tool_call(state, &request).await,
        _ => Err(JsonRpcError::method_not_found(request.method.clone())),
    };

    if is_notification {
        return None;
    }

    if let Err(e) = &result {
        warn!("Request failed: {}", e);
    }
    Some(JsonRpcResponse::from_result(id, result))
}

/// Server capabilities returned from `initialize`
pub fn initialize_result() -> Value {
    serde_json::json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": super::VERSION
        }
    })
}

/// Handle tool call requests
///
/// Argument errors and unknown tools are JSON-RPC errors. Any other tool
/// failure is reported in the MCP content envelope with `isError: true`.
pub async fn handle_tool_call(
    state: &McpState,
    req: &JsonRpcRequest,
) -> Result<Value, JsonRpcError> {
    let tool_call = req.extract_tool_call()?;
    debug!("Tool call: name={}", tool_call.name);

    let handler = state
        .handlers()
        .iter()
        .find(|h| h.name() == tool_call.name)
        .ok_or_else(|| JsonRpcError::method_not_found(tool_call.name.clone()))?;

    match handler.execute(state.suggester(), tool_call.arguments).await {
        Ok(value) => Ok(serde_json::json!({
            "content": [
                {
                    "type": "text",
                    "text": serde_json::to_string_pretty(&value)
                        .unwrap_or_else(|_| "Error serializing result".to_string())
                }
            ],
            "isError": false
        })),
        Err(e) if e.code == error_codes::INVALID_PARAMS => Err(e),
        Err(e) => {
            warn!("Tool execution failed: {}", e);
            Ok(serde_json::json!({
                "content": [
                    {
                        "type": "text",
                        "text": format!("Error: {}", e.message)
                    }
                ],
                "isError": true
            }))
        }
    }
}

/// List tools as JSON
pub fn list_tools_json(handlers: &[ToolHandler]) -> Value {
    let tools: Vec<_> = handlers
        .iter()
        .map(|handler| {
            serde_json::json!({
                "name": handler.name(),
                "description": handler.description(),
                "inputSchema": handler.argument_schema()
            })
        })
        .collect();

    serde_json::json!({ "tools": tools })
}

/// JSON-RPC request handler
async fn json_rpc_handler(State(state): State<Arc<McpState>>, body: String) -> Response {
    match handle_message(&state, &body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// List tools handler
async fn list_tools_handler(State(state): State<Arc<McpState>>) -> Json<Value> {
    Json(list_tools_json(state.handlers()))
}

/// Health check handler
async fn health_check_handler() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVER_NAME,
        "version": super::VERSION
    }))
}
