use crate::config::McpServerConfig;
use crate::mcp::{McpError, McpServer};
use std::collections::BTreeMap;

/// Launch every configured MCP server and return live handles in
/// configuration iteration order.
///
/// Failure of any single server aborts the whole launch: handles already
/// acquired are closed best-effort before the error propagates. The agent
/// never runs with a silently reduced tool set.
pub async fn launch_all(
    servers: &BTreeMap<String, McpServerConfig>,
) -> Result<Vec<McpServer>, McpError> {
    let mut handles = Vec::with_capacity(servers.len());

    for (name, spec) in servers {
        tracing::info!(server = %name, command = %spec.command, "launching mcp server");
        match McpServer::launch(name.clone(), spec).await {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                tracing::error!(server = %name, %err, "mcp server failed to launch");
                close_all(&handles).await;
                return Err(err);
            }
        }
    }

    Ok(handles)
}

/// Close every handle, best-effort. A failed close is logged and never
/// aborts the remaining releases.
pub async fn close_all(handles: &[McpServer]) {
    for handle in handles {
        if let Err(err) = handle.close().await {
            tracing::warn!(server = %handle.name(), %err, "failed to close mcp server");
        }
    }
}
