use crate::config::McpServerConfig;
use crate::mcp::McpError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};

const PROTOCOL_VERSION: &str = "2025-06-18";

/// How long to wait for a single JSON-RPC response before declaring the
/// server unresponsive.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A live handle to a launched MCP tool server.
///
/// The handle owns a child process speaking line-delimited JSON-RPC 2.0
/// over stdin/stdout. The tool list is fetched once during `launch` and
/// cached for the handle's lifetime. `close` must be called exactly once;
/// a dropped handle without `close` leaks the child process.
#[derive(Debug)]
pub struct McpServer {
    name: String,
    tools: Vec<ToolInfo>,
    transport: Arc<Transport>,
}

/// Descriptor for a single tool advertised by a server
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

impl ToolInfo {
    /// Tool definition in the shape the inference API expects.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description.clone().unwrap_or_default(),
            "input_schema": self
                .input_schema
                .clone()
                .unwrap_or_else(|| json!({ "type": "object" })),
        })
    }
}

impl McpServer {
    /// Launch the configured command, perform the MCP handshake, and fetch
    /// the tool list.
    ///
    /// Any failure here leaves no running child behind: the process is
    /// killed before the error propagates.
    pub async fn launch(name: String, spec: &McpServerConfig) -> Result<Self, McpError> {
        let mut command = Command::new(&spec.command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if !spec.args.is_empty() {
            command.args(&spec.args);
        }

        let mut child = command.spawn().map_err(|source| McpError::Spawn {
            server: name.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| transport_error(&name, "failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| transport_error(&name, "failed to capture server stdout"))?;

        let transport = Arc::new(Transport {
            server_name: name.clone(),
            writer: Mutex::new(BufWriter::new(stdin)),
            child: Mutex::new(Some(child)),
            pending: Mutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
        });

        let reader = Arc::clone(&transport);
        tokio::spawn(async move {
            reader.reader_loop(stdout).await;
        });

        let tools = match Self::handshake(&transport).await {
            Ok(tools) => tools,
            Err(err) => {
                transport.shutdown().await;
                return Err(err);
            }
        };

        tracing::info!(server = %name, tool_count = tools.len(), "mcp server connected");

        Ok(Self {
            name,
            tools,
            transport,
        })
    }

    async fn handshake(transport: &Arc<Transport>) -> Result<Vec<ToolInfo>, McpError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        transport.send_request("initialize", params).await?;
        transport
            .send_notification("notifications/initialized", json!({}))
            .await?;

        let result = transport.send_request("tools/list", json!({})).await?;
        Ok(parse_tool_list(&result))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool descriptors cached at launch time.
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    /// Whether this server advertises a tool with the given name.
    pub fn has_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool)
    }

    /// Invoke a tool and return its textual output.
    pub async fn invoke(&self, tool: &str, arguments: Value) -> Result<String, McpError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => json!({}),
                other => other,
            }
        });
        let result = self.transport.send_request("tools/call", params).await?;

        let text = extract_content_text(&result);
        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(McpError::ToolFailed {
                server: self.name.clone(),
                tool: tool.to_string(),
                message: if text.is_empty() {
                    "tool reported an error".to_string()
                } else {
                    text
                },
            });
        }
        Ok(text)
    }

    /// Release the handle: kill the child process and fail any in-flight
    /// requests. Safe to call more than once; only the first call does work.
    pub async fn close(&self) -> Result<(), McpError> {
        self.transport.shutdown().await;
        Ok(())
    }
}

#[derive(Debug)]
struct Transport {
    server_name: String,
    writer: Mutex<BufWriter<ChildStdin>>,
    child: Mutex<Option<Child>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Value, McpError>>>>,
    id_counter: AtomicU64,
}

impl Transport {
    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Some servers emit ANSI-coloured log lines on stdout.
            if trimmed.starts_with('\u{1b}') {
                tracing::debug!(server = %self.server_name, line = trimmed, "skipping non-JSON line from mcp server");
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(message) => self.dispatch(message).await,
                Err(source) => {
                    tracing::warn!(
                        server = %self.server_name,
                        line = trimmed,
                        %source,
                        "received invalid JSON from mcp server"
                    );
                }
            }
        }

        // Stdout closed: the server is gone.
        self.shutdown().await;
    }

    async fn dispatch(&self, message: Value) {
        match (message.get("id").cloned(), message.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, &message).await,
            (Some(id), false) => self.handle_response(id, message).await,
            (None, true) => {
                let method = message.get("method").and_then(Value::as_str).unwrap_or("");
                tracing::debug!(server = %self.server_name, method, "ignoring notification from mcp server");
            }
            (None, false) => {}
        }
    }

    async fn handle_response(&self, id: Value, message: Value) {
        let Some(key) = id.as_u64() else {
            tracing::debug!(server = %self.server_name, "response with non-numeric id");
            return;
        };

        let sender = self.pending.lock().await.remove(&key);
        let Some(sender) = sender else {
            tracing::debug!(server = %self.server_name, response_id = key, "response for unknown request");
            return;
        };

        let outcome = if let Some(error) = message.get("error") {
            Err(McpError::Rpc {
                server: self.server_name.clone(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            })
        } else {
            Ok(message.get("result").cloned().unwrap_or(Value::Null))
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, message: &Value) {
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let reply = match method {
            "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
            other => {
                tracing::warn!(server = %self.server_name, method = other, "server sent unsupported request");
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32601,
                        "message": format!("client does not implement method '{other}'"),
                    }
                })
            }
        };
        if let Err(err) = self.write_message(&reply).await {
            tracing::warn!(server = %self.server_name, %err, "failed to answer server request");
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(McpError::Terminated {
                server: self.server_name.clone(),
            }),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(transport_error(
                    &self.server_name,
                    format!("request '{method}' timed out"),
                ))
            }
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), McpError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), McpError> {
        let encoded = serde_json::to_string(message).map_err(|source| McpError::InvalidJson {
            server: self.server_name.clone(),
            source,
        })?;

        let mut writer = self.writer.lock().await;
        writer
            .write_all(encoded.as_bytes())
            .await
            .map_err(|e| transport_error(&self.server_name, e.to_string()))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| transport_error(&self.server_name, e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| transport_error(&self.server_name, e.to_string()))
    }

    async fn shutdown(&self) {
        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            if let Err(err) = child.kill().await {
                tracing::debug!(
                    server = %self.server_name,
                    %err,
                    "failed to kill mcp server process (may have already exited)"
                );
            }
            let _ = child.wait().await;
            tracing::info!(server = %self.server_name, "mcp server closed");
        }

        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(McpError::Terminated {
                server: self.server_name.clone(),
            }));
        }
    }
}

fn transport_error(server: &str, message: impl Into<String>) -> McpError {
    McpError::Transport {
        server: server.to_string(),
        message: message.into(),
    }
}

/// Parse the result of a `tools/list` call into tool descriptors.
fn parse_tool_list(result: &Value) -> Vec<ToolInfo> {
    let Some(array) = result.get("tools").and_then(Value::as_array) else {
        return Vec::new();
    };

    array
        .iter()
        .filter_map(|tool| {
            let name = tool.get("name").and_then(Value::as_str)?;
            Some(ToolInfo {
                name: name.to_string(),
                description: tool
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                input_schema: tool.get("inputSchema").cloned(),
            })
        })
        .collect()
}

/// Concatenate the text blocks of a `tools/call` result.
fn extract_content_text(result: &Value) -> String {
    let Some(content) = result.get("content").and_then(Value::as_array) else {
        return String::new();
    };

    let mut out = String::new();
    for block in content {
        if block.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tool_list_with_schemas() {
        let result = json!({
            "tools": [
                { "name": "search", "description": "Search the web", "inputSchema": { "type": "object" } },
                { "name": "fetch" },
                { "description": "missing name is skipped" }
            ]
        });

        let tools = parse_tool_list(&result);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "search");
        assert_eq!(tools[0].description.as_deref(), Some("Search the web"));
        assert!(tools[0].input_schema.is_some());
        assert_eq!(tools[1].name, "fetch");
        assert!(tools[1].description.is_none());
    }

    #[test]
    fn empty_tool_list_for_missing_field() {
        assert!(parse_tool_list(&json!({})).is_empty());
    }

    #[test]
    fn tool_definition_fills_in_defaults() {
        let info = ToolInfo {
            name: "fetch".to_string(),
            description: None,
            input_schema: None,
        };
        let def = info.definition();
        assert_eq!(def["name"], "fetch");
        assert_eq!(def["description"], "");
        assert_eq!(def["input_schema"]["type"], "object");
    }

    #[test]
    fn extracts_and_joins_text_blocks() {
        let result = json!({
            "content": [
                { "type": "text", "text": "line one" },
                { "type": "image", "data": "..." },
                { "type": "text", "text": "line two" }
            ]
        });
        assert_eq!(extract_content_text(&result), "line one\nline two");
    }

    #[test]
    fn empty_text_for_missing_content() {
        assert_eq!(extract_content_text(&json!({})), "");
    }
}
