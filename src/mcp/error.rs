use thiserror::Error;

/// Errors from launching or talking to an MCP tool server
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },

    #[error("MCP server '{server}' sent invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },

    #[error("Tool '{tool}' on MCP server '{server}' failed: {message}")]
    ToolFailed {
        server: String,
        tool: String,
        message: String,
    },

    #[error("No attached MCP server advertises tool '{0}'")]
    ToolNotFound(String),
}
