//! Test fixtures for chats and messages.
//!
//! Timestamps are expressed as seconds after a fixed epoch so tests can
//! reason about ordering without touching the clock.

use chatsync_protocol::{Chat, ChatId, ChatStatus, Message};
use chrono::{DateTime, TimeZone, Utc};

/// Fixed base time for fixtures (2023-11-14T22:13:20Z).
pub const BASE_EPOCH: i64 = 1_700_000_000;

/// Returns `BASE_EPOCH + secs` as a timestamp.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_EPOCH + secs, 0)
        .single()
        .expect("fixture timestamp out of range")
}

/// Builds a confirmed customer message.
pub fn message(chat_id: ChatId, id: i64, message_id: &str, text: &str, secs: i64) -> Message {
    Message {
        id,
        message_id: message_id.to_string(),
        chat_id,
        from_me: false,
        text: text.to_string(),
        timestamp: at(secs),
        created_at: at(secs),
    }
}

/// Builds a message sent by the agent.
pub fn agent_message(chat_id: ChatId, id: i64, message_id: &str, text: &str, secs: i64) -> Message {
    Message {
        from_me: true,
        ..message(chat_id, id, message_id, text, secs)
    }
}

/// Builder for [`Chat`] fixtures.
#[derive(Debug, Clone)]
pub struct ChatBuilder {
    chat: Chat,
}

impl ChatBuilder {
    /// Starts a chat with a phone and channel id derived from `id`.
    pub fn new(id: ChatId) -> Self {
        let phone = format!("55119{id:08}");
        Self {
            chat: Chat::new(id, format!("{phone}@c.us"), format!("Cliente {id}"), phone),
        }
    }

    /// Sets the display name.
    pub fn name(mut self, name: &str) -> Self {
        self.chat.name = name.to_string();
        self
    }

    /// Sets the phone.
    pub fn phone(mut self, phone: &str) -> Self {
        self.chat.phone = phone.to_string();
        self
    }

    /// Sets the status.
    pub fn status(mut self, status: ChatStatus) -> Self {
        self.chat.status = status;
        self
    }

    /// Sets the summary fields without adding messages.
    pub fn last(mut self, text: &str, secs: i64) -> Self {
        self.chat.last_message = text.to_string();
        self.chat.last_message_time = Some(at(secs));
        self
    }

    /// Adds messages and points the summary at the latest one.
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.chat.messages = messages;
        self.chat.refresh_last_message();
        self
    }

    /// Marks the chat inactive.
    pub fn inactive(mut self) -> Self {
        self.chat.is_active = false;
        self
    }

    /// Finishes the chat.
    pub fn build(self) -> Chat {
        self.chat
    }
}

/// Shorthand for `ChatBuilder::new(id).last("", secs).build()`.
pub fn chat_at(id: ChatId, secs: i64) -> Chat {
    ChatBuilder::new(id).last("", secs).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_refreshes_summary() {
        let chat = ChatBuilder::new(3)
            .messages(vec![
                message(3, 1, "a", "first", 10),
                message(3, 2, "b", "second", 20),
            ])
            .build();
        assert_eq!(chat.last_message, "second");
        assert_eq!(chat.last_message_time, Some(at(20)));
        assert_eq!(chat.phone, "5511900000003");
        assert_eq!(chat.waha_id, "5511900000003@c.us");
    }

    #[test]
    fn agent_messages_are_from_me() {
        assert!(agent_message(1, 1, "x", "oi", 0).from_me);
        assert!(!message(1, 1, "x", "oi", 0).from_me);
    }
}
