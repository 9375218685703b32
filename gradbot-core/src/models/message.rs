use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry.
///
/// `exchange` ties an assistant reply to the user message that prompted it;
/// both carry the same id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub exchange: u64,
}

impl Message {
    pub fn user(content: impl Into<String>, exchange: u64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            exchange,
        }
    }

    pub fn assistant(content: impl Into<String>, exchange: u64) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            exchange,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Hour and minute in the server's local zone.
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string()
    }

    /// Wire form sent as conversation context; the timestamp stays client side.
    pub fn turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Chat endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_drops_timestamp() {
        let message = Message::user("hello", 1);
        let wire = serde_json::to_value(message.turn()).unwrap();
        assert_eq!(wire, json!({ "role": "user", "content": "hello" }));
    }

    #[test]
    fn display_time_is_hours_and_minutes() {
        let time = Message::assistant("hi", 1).display_time();
        assert_eq!(time.len(), 5);
        assert_eq!(time.as_bytes()[2], b':');
    }

    #[test]
    fn reply_requires_message_field() {
        assert!(serde_json::from_value::<ChatReply>(json!({ "answer": "hi" })).is_err());
        let reply: ChatReply = serde_json::from_value(json!({ "message": "hi" })).unwrap();
        assert_eq!(reply.message, "hi");
    }
}
