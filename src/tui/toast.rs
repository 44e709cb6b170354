use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};

/// How long a toast stays on screen
const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Transient notification overlay (e.g. "🛠 using tool: search").
///
/// Independent of the transcript: shown in a corner and expired on tick.
#[derive(Debug, Clone)]
pub struct Toast {
    text: String,
    shown_at: Instant,
}

impl Toast {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown_at: Instant::now(),
        }
    }

    /// A toast naming an invoked tool
    pub fn tool_use(tool_name: &str) -> Self {
        Self::new(format!("🛠 using tool: {tool_name}"))
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= TOAST_DURATION
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render in the top-right corner of the given area
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let width = (self.text.chars().count() as u16 + 4).min(area.width);
        let toast_area = Rect {
            x: area.x + area.width.saturating_sub(width + 1),
            y: area.y + 1,
            width,
            height: 3.min(area.height),
        };

        let paragraph = Paragraph::new(Line::from(Span::styled(
            self.text.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Yellow)),
        );

        frame.render_widget(Clear, toast_area);
        frame.render_widget(paragraph, toast_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_toast_names_the_tool() {
        let toast = Toast::tool_use("search");
        assert!(toast.text().contains("search"));
        assert!(!toast.is_expired());
    }
}
