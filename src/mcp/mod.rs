// MCP (Model Context Protocol) JSON-RPC Server
//
// This module exposes the library suggester to AI assistants via JSON-RPC 2.0,
// over HTTP or over stdio.
//
// # Example
//
// ```ignore
// use lesuggestion::{LibrarySuggester, SqliteStore};
// use lesuggestion::mcp::{McpServer, McpServerConfig};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = SqliteStore::open(".lesuggestion/store.db")?;
//     let suggester = LibrarySuggester::new(Arc::new(store));
//
//     let server = McpServer::new(McpServerConfig::default(), suggester);
//     server.run().await?;
//
//     Ok(())
// }
// ```

/// JSON-RPC protocol types
pub mod protocol;

/// Request dispatch and HTTP transport
pub mod server;

/// Tool handlers
pub mod handlers;

/// Stdio transport
pub mod stdio;

pub use handlers::ToolHandler;
pub use protocol::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{handle_message, handle_request, McpServer, McpServerConfig, McpState};
pub use stdio::serve_stdio;

/// MCP server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
