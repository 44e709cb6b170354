use chrono::{DateTime, Local};

/// Represents the role/sender of a message in the transcript
#[derive(Debug, Clone, PartialEq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Error,
}

/// A single chat message in the transcript
#[derive(Debug, Clone)]
pub struct ChatMessage {
    #[allow(dead_code)]
    pub id: usize,
    pub role: MessageRole,
    pub content: String,
    #[allow(dead_code)]
    pub timestamp: DateTime<Local>,
    /// false while streaming deltas are still arriving
    pub is_complete: bool,
}

impl ChatMessage {
    /// Create a new user message (always complete)
    pub fn user(id: usize, content: String) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content,
            timestamp: Local::now(),
            is_complete: true,
        }
    }

    /// Create a new assistant message that's being streamed
    pub fn assistant_streaming(id: usize) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: Local::now(),
            is_complete: false,
        }
    }

    /// Create a system message
    pub fn system(id: usize, content: String) -> Self {
        Self {
            id,
            role: MessageRole::System,
            content,
            timestamp: Local::now(),
            is_complete: true,
        }
    }

    /// Create an error message
    pub fn error(id: usize, content: String) -> Self {
        Self {
            id,
            role: MessageRole::Error,
            content,
            timestamp: Local::now(),
            is_complete: true,
        }
    }

    /// Append text to the message content (for streaming)
    pub fn append_content(&mut self, text: &str) {
        self.content.push_str(text);
    }

    /// Mark the message as complete (streaming finished)
    pub fn complete(&mut self) {
        self.is_complete = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_is_complete() {
        let msg = ChatMessage::user(1, "Hello".to_string());
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.is_complete);
    }

    #[test]
    fn streaming_message_accumulates_deltas() {
        let mut msg = ChatMessage::assistant_streaming(2);
        assert!(!msg.is_complete);

        msg.append_content("Trending");
        msg.append_content(" topics");
        msg.append_content(" today");
        assert_eq!(msg.content, "Trending topics today");
        assert!(!msg.is_complete);

        msg.complete();
        assert!(msg.is_complete);
    }
}
