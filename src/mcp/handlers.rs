// MCP Tool Handlers
//
// This module implements the handlers for each MCP tool that the server exposes.

use super::protocol::JsonRpcError;
use crate::error::SuggestError;
use crate::suggest::{LibrarySuggester, MAX_RESULTS_LIMIT};
use serde_json::Value;

/// Enum of all tool handlers
///
/// Instead of using trait objects (which don't work well with async),
/// we use an enum to dispatch to the appropriate handler.
#[derive(Clone, Debug)]
pub enum ToolHandler {
    /// Handler for library ranking
    SuggestLibraries(SuggestLibrariesHandler),
    /// Handler for listing indexed libraries
    ListLibraries(ListLibrariesHandler),
}

impl ToolHandler {
    /// Every tool the server exposes
    pub fn all() -> Vec<ToolHandler> {
        vec![
            ToolHandler::SuggestLibraries(SuggestLibrariesHandler),
            ToolHandler::ListLibraries(ListLibrariesHandler),
        ]
    }

    /// Get the tool name
    pub fn name(&self) -> &str {
        match self {
            ToolHandler::SuggestLibraries(h) => h.name(),
            ToolHandler::ListLibraries(h) => h.name(),
        }
    }

    /// Get the tool description
    pub fn description(&self) -> &str {
        match self {
            ToolHandler::SuggestLibraries(h) => h.description(),
            ToolHandler::ListLibraries(h) => h.description(),
        }
    }

    /// Get the tool argument schema
    pub fn argument_schema(&self) -> Value {
        match self {
            ToolHandler::SuggestLibraries(h) => h.argument_schema(),
            ToolHandler::ListLibraries(h) => h.argument_schema(),
        }
    }

    /// Execute the tool
    pub async fn execute(
        &self,
        suggester: &LibrarySuggester,
        args: Value,
    ) -> Result<Value, JsonRpcError> {
        match self {
            ToolHandler::SuggestLibraries(h) => h.execute(suggester, args).await,
            ToolHandler::ListLibraries(h) => h.execute(suggester, args).await,
        }
    }
}

/// Helper to extract required string argument
fn extract_string(args: &Value, key: &str) -> Result<String, JsonRpcError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            JsonRpcError::invalid_params_with_suggestion(
                format!("Missing required argument: {}", key),
                format!("Add \"{}\": \"<value>\" to arguments", key),
            )
        })
}

/// Helper to extract an optional non-negative integer argument
///
/// Absent or null yields `None`. Negative and fractional numbers are passed
/// through as `Some(0)` so range validation rejects them uniformly.
fn extract_optional_usize(args: &Value, key: &str) -> Result<Option<usize>, JsonRpcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            if let Some(n) = v.as_u64() {
                Ok(Some(usize::try_from(n).unwrap_or(usize::MAX)))
            } else if v.is_number() {
                Ok(Some(0))
            } else {
                Err(JsonRpcError::invalid_params(format!(
                    "Invalid integer argument: {}",
                    key
                )))
            }
        }
    }
}

/// Map a suggester error onto the JSON-RPC error space
fn suggest_error(e: SuggestError) -> JsonRpcError {
    match e {
        SuggestError::InvalidArgument {
            message,
            suggestion: Some(suggestion),
        } => JsonRpcError::invalid_params_with_suggestion(message, suggestion),
        SuggestError::InvalidArgument { message, .. } => JsonRpcError::invalid_params(message),
        SuggestError::Store(e) => JsonRpcError::store_unavailable(format!("Store error: {}", e)),
    }
}

/// Handler for suggest_libraries
///
/// Ranks indexed libraries by their best match for a query.
#[derive(Clone, Debug)]
pub struct SuggestLibrariesHandler;

impl SuggestLibrariesHandler {
    /// Returns the name of this RPC method
    pub fn name(&self) -> &str {
        "suggest_libraries"
    }

    /// Returns the description of this RPC method
    pub fn description(&self) -> &str {
        "Suggest which indexed documentation libraries are most relevant to a query. Returns libraries ranked by their best matching content."
    }

    /// Returns the JSON schema for the arguments of this RPC method
    pub fn argument_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What you are looking for (e.g., 'react hooks', 'async runtime')"
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of libraries to return (default: 5)",
                    "default": 5,
                    "minimum": 1,
                    "maximum": MAX_RESULTS_LIMIT
                }
            },
            "required": ["query"]
        })
    }

    /// Executes the RPC method
    pub async fn execute(
        &self,
        suggester: &LibrarySuggester,
        args: Value,
    ) -> Result<Value, JsonRpcError> {
        let query = extract_string(&args, "query")?;
        let max_results = extract_optional_usize(&args, "maxResults")?;

        let result = suggester
            .suggest(&query, max_results)
            .await
            .map_err(suggest_error)?;

        serde_json::to_value(result)
            .map_err(|e| JsonRpcError::internal_error(format!("Serialization error: {}", e)))
    }
}

/// Handler for list_libraries
///
/// Lists indexed libraries and their versions.
#[derive(Clone, Debug)]
pub struct ListLibrariesHandler;

impl ListLibrariesHandler {
    /// Returns the name of this RPC method
    pub fn name(&self) -> &str {
        "list_libraries"
    }

    /// Returns the description of this RPC method
    pub fn description(&self) -> &str {
        "List every indexed documentation library with its versions."
    }

    /// Returns the JSON schema for the arguments of this RPC method
    pub fn argument_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// Executes the RPC method
    pub async fn execute(
        &self,
        suggester: &LibrarySuggester,
        _args: Value,
    ) -> Result<Value, JsonRpcError> {
        let libraries = suggester
            .store()
            .list_libraries()
            .await
            .map_err(|e| JsonRpcError::store_unavailable(format!("Store error: {}", e)))?;

        Ok(serde_json::json!({ "libraries": libraries }))
    }
}
