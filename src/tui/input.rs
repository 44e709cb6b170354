use crossterm::event::KeyEvent;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders},
    Frame,
};
use tui_textarea::TextArea;

/// Input widget wrapper around tui-textarea
pub struct InputWidget {
    textarea: TextArea<'static>,
}

impl InputWidget {
    pub fn new() -> Self {
        Self {
            textarea: make_textarea(),
        }
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        self.textarea.input(key);
    }

    /// Get the current text and clear the input
    pub fn take_text(&mut self) -> String {
        let text = self.textarea.lines().join("\n");
        self.textarea = make_textarea();
        text
    }

    /// Render the input widget
    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(&self.textarea, area);
    }
}

fn make_textarea() -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Span::styled(
                " Input (Enter=send │ Shift+Enter=newline) ",
                Style::default()
                    .fg(Color::LightBlue)
                    .add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    textarea.set_cursor_line_style(Style::default());
    textarea.set_cursor_style(Style::default());
    textarea
}

impl Default for InputWidget {
    fn default() -> Self {
        Self::new()
    }
}
