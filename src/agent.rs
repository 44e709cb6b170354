use crate::config::AgentProfile;
use crate::llm::anthropic::AnthropicClient;
use crate::llm::types::{ContentBlock, Message, StreamChunk, ToolUse};
use crate::mcp::McpServer;
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Events emitted while a turn is in progress.
///
/// Consumers must tolerate variants they do not care about; the TUI only
/// renders deltas and tool notices and ignores the rest.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Text delta for the currently streaming assistant message.
    TextDelta(String),
    /// The model requested a tool call.
    ToolUse { name: String },
    /// A tool finished execution.
    ToolResult {
        tool_name: String,
        content: String,
        is_error: bool,
    },
    /// The whole user turn is complete.
    TurnComplete,
    /// Fatal error for the current turn. Always followed by TurnComplete.
    Error(String),
}

/// What a single model response stream produced.
#[derive(Debug, Default)]
pub struct StreamOutcome {
    pub text: String,
    pub tool_uses: Vec<ToolUse>,
    pub error: Option<String>,
}

/// Consume one model response stream, forwarding deltas and tool notices
/// in emission order.
///
/// Text accumulates even when the stream ends in an error, so partial
/// output is never lost.
pub async fn drain_stream<S>(
    mut stream: S,
    tx: &mpsc::UnboundedSender<AgentEvent>,
) -> StreamOutcome
where
    S: Stream<Item = StreamChunk> + Unpin,
{
    let mut outcome = StreamOutcome::default();

    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Text(text) => {
                outcome.text.push_str(&text);
                let _ = tx.send(AgentEvent::TextDelta(text));
            }
            StreamChunk::ToolUse(tool_use) => {
                let _ = tx.send(AgentEvent::ToolUse {
                    name: tool_use.name.clone(),
                });
                outcome.tool_uses.push(tool_use);
            }
            StreamChunk::Done => break,
            StreamChunk::Error(err) => {
                outcome.error = Some(err);
                break;
            }
        }
    }

    outcome
}

/// Conversation agent: identity, instructions, model endpoint, and the
/// tool servers it may call.
///
/// UI-agnostic: turns emit `AgentEvent`s that any frontend can consume.
/// The conversation history lives here for the whole session and is sent
/// in full on every model call.
pub struct Agent {
    profile: AgentProfile,
    llm_client: AnthropicClient,
    servers: Arc<Vec<McpServer>>,
    conversation: Arc<Mutex<Vec<Message>>>,
    turn_active: Arc<AtomicBool>,
}

impl Agent {
    pub fn new(
        profile: AgentProfile,
        llm_client: AnthropicClient,
        servers: Arc<Vec<McpServer>>,
    ) -> Self {
        Self {
            profile,
            llm_client,
            servers,
            conversation: Arc::new(Mutex::new(Vec::new())),
            turn_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Submit a user message and start the agent turn.
    ///
    /// Returns a receiver of `AgentEvent`s, or `None` when a turn is
    /// already running: turns are strictly one at a time.
    pub fn start_turn(&self, user_text: String) -> Option<mpsc::UnboundedReceiver<AgentEvent>> {
        if self.turn_active.swap(true, Ordering::SeqCst) {
            tracing::warn!("rejected re-entrant turn start");
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let llm_client = self.llm_client.clone();
        let instructions = self.profile.instructions.clone();
        let servers = self.servers.clone();
        let conversation = self.conversation.clone();
        let turn_active = self.turn_active.clone();

        tokio::spawn(async move {
            // Cleared on every exit path, including panics in the loop body.
            let _guard = TurnGuard(turn_active);
            run_turn(user_text, llm_client, instructions, servers, conversation, tx).await;
        });

        Some(rx)
    }
}

struct TurnGuard(Arc<AtomicBool>);

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn run_turn(
    user_text: String,
    llm_client: AnthropicClient,
    instructions: String,
    servers: Arc<Vec<McpServer>>,
    conversation: Arc<Mutex<Vec<Message>>>,
    tx: mpsc::UnboundedSender<AgentEvent>,
) {
    conversation.lock().await.push(Message::user(user_text));

    let system = if instructions.is_empty() {
        None
    } else {
        Some(instructions)
    };

    let tool_definitions: Vec<serde_json::Value> = servers
        .iter()
        .flat_map(|server| server.tools().iter().map(|tool| tool.definition()))
        .collect();
    let tools = if tool_definitions.is_empty() {
        None
    } else {
        Some(tool_definitions)
    };

    loop {
        let snapshot = { conversation.lock().await.clone() };

        let stream = match llm_client
            .stream_chat(snapshot, system.clone(), tools.clone())
            .await
        {
            Ok(s) => s,
            Err(e) => {
                let _ = tx.send(AgentEvent::Error(e.to_string()));
                let _ = tx.send(AgentEvent::TurnComplete);
                return;
            }
        };

        let outcome = drain_stream(stream, &tx).await;

        // Persist whatever the model produced, partial text included, so
        // the history reflects exactly what the user saw.
        {
            let mut convo = conversation.lock().await;
            if !outcome.tool_uses.is_empty() {
                let mut blocks = Vec::new();
                if !outcome.text.is_empty() {
                    blocks.push(ContentBlock::Text {
                        text: outcome.text.clone(),
                    });
                }
                blocks.extend(outcome.tool_uses.iter().cloned().map(ContentBlock::ToolUse));
                convo.push(Message::assistant_with_blocks(blocks));
            } else if !outcome.text.is_empty() {
                convo.push(Message::assistant(outcome.text.clone()));
            }
        }

        if let Some(err) = outcome.error {
            fail_tool_calls(&conversation, &outcome.tool_uses, &err).await;
            let _ = tx.send(AgentEvent::Error(err));
            let _ = tx.send(AgentEvent::TurnComplete);
            return;
        }

        if outcome.tool_uses.is_empty() {
            let _ = tx.send(AgentEvent::TurnComplete);
            return;
        }

        // Execute the requested tools in order. A failed invocation is
        // terminal for the turn; there is no retry.
        for (index, tool_use) in outcome.tool_uses.iter().enumerate() {
            match invoke_tool(&servers, tool_use).await {
                Ok(result) => {
                    let _ = tx.send(AgentEvent::ToolResult {
                        tool_name: tool_use.name.clone(),
                        content: result.clone(),
                        is_error: false,
                    });
                    conversation.lock().await.push(Message::tool_result(
                        tool_use.id.clone(),
                        result,
                        None,
                    ));
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::error!(tool = %tool_use.name, %err, "tool invocation failed");
                    let _ = tx.send(AgentEvent::ToolResult {
                        tool_name: tool_use.name.clone(),
                        content: message.clone(),
                        is_error: true,
                    });
                    fail_tool_calls(&conversation, &outcome.tool_uses[index..], &message).await;
                    let _ = tx.send(AgentEvent::Error(message));
                    let _ = tx.send(AgentEvent::TurnComplete);
                    return;
                }
            }
        }

        // Continue loop: call the model again with the tool results.
    }
}

/// Find the first attached server advertising the tool and invoke it.
async fn invoke_tool(
    servers: &[McpServer],
    tool_use: &ToolUse,
) -> Result<String, crate::mcp::McpError> {
    let server = servers
        .iter()
        .find(|s| s.has_tool(&tool_use.name))
        .ok_or_else(|| crate::mcp::McpError::ToolNotFound(tool_use.name.clone()))?;

    tracing::debug!(server = %server.name(), tool = %tool_use.name, "invoking tool");
    server.invoke(&tool_use.name, tool_use.input.clone()).await
}

/// Record error results for outstanding tool calls so the persisted
/// history stays well-formed (every tool_use needs a matching
/// tool_result before the next model call).
async fn fail_tool_calls(
    conversation: &Arc<Mutex<Vec<Message>>>,
    tool_uses: &[ToolUse],
    error: &str,
) {
    if tool_uses.is_empty() {
        return;
    }
    let mut convo = conversation.lock().await;
    for tool_use in tool_uses {
        convo.push(Message::tool_result(
            tool_use.id.clone(),
            error.to_string(),
            Some(true),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect_events(rx: &mut mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn drain_forwards_deltas_in_order() {
        let chunks = vec![
            StreamChunk::Text("Trending".to_string()),
            StreamChunk::Text(" topics".to_string()),
            StreamChunk::Text(" today".to_string()),
            StreamChunk::Done,
        ];
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = drain_stream(futures::stream::iter(chunks), &tx).await;

        assert_eq!(outcome.text, "Trending topics today");
        assert!(outcome.tool_uses.is_empty());
        assert!(outcome.error.is_none());

        let deltas: Vec<String> = collect_events(&mut rx)
            .into_iter()
            .map(|e| match e {
                AgentEvent::TextDelta(t) => t,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(deltas, vec!["Trending", " topics", " today"]);
    }

    #[tokio::test]
    async fn drain_interleaves_tool_notices_with_text() {
        let chunks = vec![
            StreamChunk::Text("Let me check. ".to_string()),
            StreamChunk::ToolUse(ToolUse {
                id: "toolu_1".to_string(),
                name: "search".to_string(),
                input: json!({ "query": "trending" }),
            }),
            StreamChunk::Text("Done.".to_string()),
            StreamChunk::Done,
        ];
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = drain_stream(futures::stream::iter(chunks), &tx).await;

        assert_eq!(outcome.tool_uses.len(), 1);
        assert_eq!(outcome.tool_uses[0].name, "search");

        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], AgentEvent::TextDelta(t) if t == "Let me check. "));
        assert!(matches!(&events[1], AgentEvent::ToolUse { name } if name == "search"));
        assert!(matches!(&events[2], AgentEvent::TextDelta(t) if t == "Done."));
    }

    #[tokio::test]
    async fn drain_keeps_partial_text_on_error() {
        let chunks = vec![
            StreamChunk::Text("Here is".to_string()),
            StreamChunk::Error("connection reset".to_string()),
            // Anything after a terminal error must not be consumed.
            StreamChunk::Text(" more".to_string()),
        ];
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = drain_stream(futures::stream::iter(chunks), &tx).await;

        assert_eq!(outcome.text, "Here is");
        assert_eq!(outcome.error.as_deref(), Some("connection reset"));

        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AgentEvent::TextDelta(t) if t == "Here is"));
    }

    #[tokio::test]
    async fn fail_tool_calls_records_error_results() {
        let conversation = Arc::new(Mutex::new(Vec::new()));
        let tool_uses = vec![
            ToolUse {
                id: "toolu_1".to_string(),
                name: "search".to_string(),
                input: json!({}),
            },
            ToolUse {
                id: "toolu_2".to_string(),
                name: "fetch".to_string(),
                input: json!({}),
            },
        ];

        fail_tool_calls(&conversation, &tool_uses, "server gone").await;

        let convo = conversation.lock().await;
        assert_eq!(convo.len(), 2);
        let value = serde_json::to_value(&convo[0]).unwrap();
        assert_eq!(value["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(value["content"][0]["is_error"], true);
    }
}
