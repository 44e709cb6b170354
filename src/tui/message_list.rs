use crate::tui::message::{ChatMessage, MessageRole};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use textwrap::wrap;

/// Scrolling transcript of the conversation
pub struct MessageList {
    messages: Vec<ChatMessage>,
    // Heights accumulate in usize: a long session's transcript can exceed
    // what u16 holds, even though any one frame fits.
    scroll_offset: usize,
    viewport_height: u16,
    auto_scroll: bool,
}

impl MessageList {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            scroll_offset: 0,
            viewport_height: 0,
            auto_scroll: true,
        }
    }

    /// Add a new message to the list
    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.auto_scroll {
            self.auto_scroll_to_bottom();
        }
    }

    /// Get the current streaming message (last incomplete message)
    pub fn get_current_streaming_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().rev().find(|msg| !msg.is_complete)
    }

    fn calculate_message_height(&self, message: &ChatMessage, width: u16) -> usize {
        let border_height = 2;
        let padding = 2; // role header line plus breathing room

        let content_width = width.saturating_sub(6);
        let wrapped_lines = self.wrap_text(&message.content, content_width as usize);
        let content_lines = wrapped_lines.len().max(1);

        border_height + padding + content_lines
    }

    fn wrap_text(&self, text: &str, max_width: usize) -> Vec<String> {
        if text.is_empty() {
            return vec![String::new()];
        }

        let max_width = max_width.max(10);
        wrap(text, max_width)
            .into_iter()
            .map(|cow| cow.to_string())
            .collect()
    }

    fn calculate_total_height(&self, width: u16) -> usize {
        let mut total = 0usize;
        for msg in &self.messages {
            total += self.calculate_message_height(msg, width);
            total += 2; // spacing between messages
        }
        total.saturating_sub(2)
    }

    /// Render the message list
    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.viewport_height = area.height;

        if self.messages.is_empty() {
            return;
        }

        let width = area.width;
        let mut current_y = 0usize;
        let visible_start = self.scroll_offset;
        let visible_end = visible_start + area.height as usize;

        let mut message_positions: Vec<(usize, usize)> = Vec::new();
        for msg in &self.messages {
            let height = self.calculate_message_height(msg, width);
            message_positions.push((current_y, height));
            current_y += height + 2;
        }

        for (i, msg) in self.messages.iter().enumerate() {
            let (pos, height) = message_positions[i];

            if pos + height >= visible_start && pos < visible_end {
                let render_y = pos.saturating_sub(visible_start) as u16;
                let msg_area = Rect {
                    x: area.x,
                    y: area.y + render_y,
                    width,
                    height: height.min(area.height.saturating_sub(render_y) as usize) as u16,
                };

                self.render_message(frame, msg, msg_area);
            }
        }

        if self.auto_scroll {
            let total_height = self.calculate_total_height(width);
            if total_height > area.height as usize {
                self.scroll_offset = total_height - area.height as usize;
            }
        }
    }

    fn render_message(&self, frame: &mut Frame, message: &ChatMessage, area: Rect) {
        let (border_color, role_text, role_emoji) = match message.role {
            MessageRole::User => (Color::LightCyan, "You", "👤"),
            MessageRole::Assistant => (Color::LightGreen, "Agent", "🤖"),
            MessageRole::System => (Color::LightBlue, "System", "ℹ️"),
            MessageRole::Error => (Color::LightRed, "Error", "⚠️"),
        };

        // Cursor indicator for streaming messages.
        let content = if !message.is_complete {
            if message.content.is_empty() {
                "⋯".to_string()
            } else {
                format!("{} ▌", message.content)
            }
        } else {
            message.content.clone()
        };

        let content_width = area.width.saturating_sub(8) as usize;
        let wrapped = self.wrap_text(&content, content_width);

        let prefix_style = Style::default()
            .fg(border_color)
            .add_modifier(Modifier::BOLD);

        let mut lines = Vec::new();
        lines.push(Line::from(vec![
            Span::raw(" "),
            Span::raw(role_emoji),
            Span::raw(" "),
            Span::styled(role_text, prefix_style),
        ]));
        for line in wrapped.iter() {
            lines.push(Line::from(format!("  {}", line)));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .border_type(BorderType::Rounded);

        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }

    /// Scroll down by a number of lines
    pub fn scroll_down(&mut self, lines: u16) {
        let total_height = self.calculate_total_height(self.viewport_height.max(1));
        let max_scroll = total_height.saturating_sub(self.viewport_height as usize);

        if self.scroll_offset < max_scroll {
            self.scroll_offset = (self.scroll_offset + lines as usize).min(max_scroll);

            if self.scroll_offset >= max_scroll {
                self.auto_scroll = true;
            }
        }
    }

    /// Scroll up by a number of lines; disables auto-scroll
    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines as usize);
        self.auto_scroll = false;
    }

    fn auto_scroll_to_bottom(&mut self) {
        let total_height = self.calculate_total_height(self.viewport_height.max(1));
        let viewport = self.viewport_height as usize;
        if total_height > viewport {
            self.scroll_offset = total_height - viewport;
        } else {
            self.scroll_offset = 0;
        }
    }

    /// Re-enable auto-scroll and jump to the bottom
    pub fn enable_auto_scroll(&mut self) {
        self.auto_scroll = true;
        self.auto_scroll_to_bottom();
    }

    /// Get the number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// The most recent message, if any
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_heights_past_u16_do_not_overflow() {
        let mut list = MessageList::new();
        list.viewport_height = 24;

        // Enough content to wrap into a few hundred thousand rendered lines.
        let long = "word ".repeat(1_200_000);
        list.messages.push(ChatMessage::user(0, long));

        let total = list.calculate_total_height(list.viewport_height);
        assert!(total > u16::MAX as usize);

        list.auto_scroll_to_bottom();
        assert_eq!(list.scroll_offset, total - 24);

        list.scroll_up(10);
        assert_eq!(list.scroll_offset, total - 34);
        list.scroll_down(u16::MAX);
        assert_eq!(list.scroll_offset, total - 24);
    }

    #[test]
    fn short_transcripts_stay_pinned_to_the_top() {
        let mut list = MessageList::new();
        list.viewport_height = 24;
        list.add_message(ChatMessage::user(0, "hi".to_string()));

        assert_eq!(list.scroll_offset, 0);
        list.scroll_down(5);
        assert_eq!(list.scroll_offset, 0);
    }
}
