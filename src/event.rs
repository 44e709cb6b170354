use crossterm::event::{KeyEvent, MouseEvent};

/// Terminal events forwarded to the application
#[derive(Debug, Clone)]
pub enum Event {
    /// Terminal key press event
    Key(KeyEvent),
    /// Terminal mouse event
    Mouse(MouseEvent),
    /// Terminal resize event
    Resize(u16, u16),
}

/// Result type for event handling
pub type EventResult<T> = anyhow::Result<T>;
