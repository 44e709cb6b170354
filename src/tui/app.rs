use crate::agent::{Agent, AgentEvent};
use crate::event::{Event, EventResult};
use crate::tui::{ChatMessage, InputWidget, MessageList, Toast};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tokio::sync::mpsc;

/// Maximum number of toasts shown at once
const MAX_VISIBLE_TOASTS: usize = 3;

/// Main application state: the event relay between the agent and the
/// terminal.
///
/// Submits at most one turn at a time and waits for `TurnComplete` before
/// accepting the next input.
pub struct App {
    /// Conversation agent driving the turns
    agent: Agent,
    /// Message list component with scrolling support
    message_list: MessageList,
    /// Current message ID counter
    current_message_id: usize,
    /// Input widget for user text
    pub input: InputWidget,
    /// Whether the application should quit
    should_quit: bool,
    /// Whether a turn is currently in flight
    is_loading: bool,
    /// Channel receiver for agent events of the in-flight turn
    event_receiver: Option<mpsc::UnboundedReceiver<AgentEvent>>,
    /// Transient tool-use notifications
    toasts: Vec<Toast>,
}

impl App {
    /// Create a new application instance
    pub fn new(agent: Agent, tool_count: usize) -> Self {
        let mut message_list = MessageList::new();
        let mut current_id = 0;

        message_list.add_message(ChatMessage::system(
            current_id,
            format!("Welcome! You are chatting with {}.", agent.name()),
        ));
        current_id += 1;

        message_list.add_message(ChatMessage::system(
            current_id,
            format!("{} tool(s) available from MCP servers.", tool_count),
        ));
        current_id += 1;

        message_list.add_message(ChatMessage::system(
            current_id,
            "Controls: Enter=send | Shift+Enter=newline | ↑↓=scroll | End=bottom | Ctrl+C=quit"
                .to_string(),
        ));
        current_id += 1;

        Self {
            agent,
            message_list,
            current_message_id: current_id,
            input: InputWidget::new(),
            should_quit: false,
            is_loading: false,
            event_receiver: None,
            toasts: Vec::new(),
        }
    }

    /// Check if the application should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether a turn is in flight
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Currently visible toasts
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    /// The transcript (for inspection in tests)
    pub fn message_list(&self) -> &MessageList {
        &self.message_list
    }

    /// Drain any pending agent events for the in-flight turn
    pub fn poll_agent_events(&mut self) {
        let mut pending = Vec::new();
        if let Some(receiver) = &mut self.event_receiver {
            while let Ok(event) = receiver.try_recv() {
                pending.push(event);
            }
        }
        for event in pending {
            self.handle_agent_event(event);
        }
    }

    /// Relay a single agent event to the screen state
    pub fn handle_agent_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::TextDelta(text) => {
                if let Some(msg) = self.message_list.get_current_streaming_mut() {
                    msg.append_content(&text);
                }
            }
            AgentEvent::ToolUse { name } => {
                tracing::info!(tool = %name, "tool invoked");
                self.toasts.push(Toast::tool_use(&name));
            }
            AgentEvent::Error(err) => {
                // Partial text stays in the transcript; the failure gets
                // its own visible entry.
                if let Some(msg) = self.message_list.get_current_streaming_mut() {
                    msg.complete();
                }
                self.message_list
                    .add_message(ChatMessage::error(self.current_message_id, err));
                self.current_message_id += 1;
            }
            AgentEvent::TurnComplete => {
                if let Some(msg) = self.message_list.get_current_streaming_mut() {
                    msg.complete();
                }
                self.is_loading = false;
                self.event_receiver = None;
            }
            // Other kinds (tool results etc.) carry nothing to render.
            other => {
                tracing::debug!(?other, "ignoring agent event");
            }
        }
    }

    /// Periodic housekeeping: expire old toasts
    pub fn tick(&mut self) {
        self.toasts.retain(|toast| !toast.is_expired());
    }

    /// Handle an event
    pub fn handle_event(&mut self, event: Event) -> EventResult<()> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            // Ratatui recomputes the layout on the next draw.
            Event::Resize(..) => Ok(()),
        }
    }

    fn handle_mouse(&mut self, mouse: crossterm::event::MouseEvent) -> EventResult<()> {
        use crossterm::event::MouseEventKind;

        match mouse.kind {
            MouseEventKind::ScrollUp => self.message_list.scroll_up(3),
            MouseEventKind::ScrollDown => self.message_list.scroll_down(3),
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> EventResult<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        match key.code {
            KeyCode::Up => {
                self.message_list.scroll_up(1);
                return Ok(());
            }
            KeyCode::Down => {
                self.message_list.scroll_down(1);
                return Ok(());
            }
            KeyCode::PageUp => {
                self.message_list.scroll_up(10);
                return Ok(());
            }
            KeyCode::PageDown => {
                self.message_list.scroll_down(10);
                return Ok(());
            }
            KeyCode::Home => {
                self.message_list.scroll_up(u16::MAX);
                return Ok(());
            }
            KeyCode::End => {
                self.message_list.enable_auto_scroll();
                return Ok(());
            }
            _ => {}
        }

        // Enter submits (Shift+Enter inserts a newline).
        if key.code == KeyCode::Enter && !key.modifiers.contains(KeyModifiers::SHIFT) {
            if !self.is_loading {
                self.submit_message();
            }
            return Ok(());
        }

        self.input.handle_key(key);
        Ok(())
    }

    /// Submit the current input and start an agent turn
    fn submit_message(&mut self) {
        let text = self.input.take_text();
        if text.trim().is_empty() {
            return;
        }

        let user_msg = ChatMessage::user(self.current_message_id, text.clone());
        self.message_list.add_message(user_msg);
        self.current_message_id += 1;

        let Some(receiver) = self.agent.start_turn(text) else {
            tracing::warn!("turn already in progress, input dropped");
            return;
        };

        self.is_loading = true;
        let assistant_msg = ChatMessage::assistant_streaming(self.current_message_id);
        self.message_list.add_message(assistant_msg);
        self.current_message_id += 1;

        self.event_receiver = Some(receiver);
    }

    /// Render the application UI
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Chat history
                Constraint::Length(3), // Status bar
                Constraint::Length(5), // Input area
            ])
            .split(frame.area());

        self.render_chat(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.input.render(frame, chunks[2]);
        self.render_toasts(frame, chunks[0]);
    }

    fn render_chat(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Chat History")
            .border_style(Style::default().fg(Color::White));

        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.message_list.render(frame, inner);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let status_text = vec![Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Yellow)),
            Span::raw(if self.is_loading {
                "Generating..."
            } else {
                "Ready"
            }),
            Span::raw(" | "),
            Span::styled("Messages: ", Style::default().fg(Color::Cyan)),
            Span::raw(self.message_list.len().to_string()),
        ])];

        let status = Paragraph::new(status_text).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Status")
                .border_style(Style::default().fg(Color::White)),
        );

        frame.render_widget(status, area);
    }

    fn render_toasts(&self, frame: &mut Frame, area: Rect) {
        for (i, toast) in self
            .toasts
            .iter()
            .rev()
            .take(MAX_VISIBLE_TOASTS)
            .enumerate()
        {
            let offset = (i as u16) * 3;
            if offset + 3 > area.height {
                break;
            }
            let slot = Rect {
                x: area.x,
                y: area.y + offset,
                width: area.width,
                height: area.height.saturating_sub(offset),
            };
            toast.render(frame, slot);
        }
    }
}
