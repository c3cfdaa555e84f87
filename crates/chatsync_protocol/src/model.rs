//! Chat and message records exchanged with the helpdesk server.

use crate::error::ProtocolError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned chat identifier.
pub type ChatId = i64;

/// Prefix marking messages generated by the helpdesk itself.
pub const SYSTEM_MESSAGE_PREFIX: &str = "[SISTEMA]";

/// A single chat message.
///
/// Messages created locally before the server confirms them carry a negative
/// `id`. The `message_id` is the stable identity shared by the pending copy
/// and the server-confirmed copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Numeric id (negative while pending).
    pub id: i64,
    /// Stable de-duplication key. May be empty on legacy records.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_id: String,
    /// Owning chat.
    pub chat_id: ChatId,
    /// Whether the message was sent by the helpdesk side.
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_me: bool,
    /// Message body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// Time the message was sent.
    pub timestamp: DateTime<Utc>,
    /// Time the record was created.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Returns true if the message has not been confirmed by the server yet.
    pub fn is_pending(&self) -> bool {
        self.id < 0
    }

    /// Returns true for messages generated by the helpdesk system.
    pub fn is_system(&self) -> bool {
        self.text.starts_with(SYSTEM_MESSAGE_PREFIX)
    }
}

/// Business state of a chat. Transitions are driven by agents, in any direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    /// Waiting for an agent.
    #[default]
    Standby,
    /// An agent is handling the chat.
    EmAtendimento,
    /// The customer's issue was solved.
    Resolvido,
    /// The chat was closed.
    Encerrado,
}

impl ChatStatus {
    /// Every status, in workflow order.
    pub const ALL: [ChatStatus; 4] = [
        ChatStatus::Standby,
        ChatStatus::EmAtendimento,
        ChatStatus::Resolvido,
        ChatStatus::Encerrado,
    ];

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Standby => "standby",
            ChatStatus::EmAtendimento => "em_atendimento",
            ChatStatus::Resolvido => "resolvido",
            ChatStatus::Encerrado => "encerrado",
        }
    }

    /// Returns the label shown to agents.
    pub fn display_name(&self) -> &'static str {
        match self {
            ChatStatus::Standby => "Aguardando",
            ChatStatus::EmAtendimento => "Em Atendimento",
            ChatStatus::Resolvido => "Resolvido",
            ChatStatus::Encerrado => "Encerrado",
        }
    }

    /// Position in the workflow, used when sorting by status.
    pub fn rank(&self) -> u8 {
        match self {
            ChatStatus::Standby => 0,
            ChatStatus::EmAtendimento => 1,
            ChatStatus::Resolvido => 2,
            ChatStatus::Encerrado => 3,
        }
    }
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChatStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownStatus(s.to_string()))
    }
}

fn default_active() -> bool {
    true
}

/// Reads `null` as the type's default; `#[serde(default)]` alone only covers
/// a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A customer conversation and the messages held for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Server-assigned id.
    pub id: ChatId,
    /// External channel identifier (e.g. `5511999999999@c.us`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub waha_id: String,
    /// Customer display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Customer phone, digits only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    /// Text of the most recent message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_message: String,
    /// Business status.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ChatStatus,
    /// False once the chat has been deactivated.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Timestamp of the most recent message.
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
    /// Agent handling the chat, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atendente_id: Option<String>,
    /// Messages held for the chat, ascending by timestamp.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    /// Creation time on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last server-side update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Chat {
    /// Creates an active, message-less chat in `standby`.
    pub fn new(
        id: ChatId,
        waha_id: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            id,
            waha_id: waha_id.into(),
            name: name.into(),
            phone: phone.into(),
            last_message: String::new(),
            status: ChatStatus::Standby,
            is_active: true,
            last_message_time: None,
            atendente_id: None,
            messages: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns true if the chat can still receive messages.
    pub fn is_open(&self) -> bool {
        self.is_active && self.status != ChatStatus::Encerrado
    }

    /// Returns the message with the greatest timestamp (the later one on ties).
    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.iter().max_by_key(|m| m.timestamp)
    }

    /// Points `last_message`/`last_message_time` at the latest held message.
    ///
    /// Leaves both fields alone when no messages are held, so a list entry
    /// fetched without messages keeps the server's summary.
    pub fn refresh_last_message(&mut self) {
        if let Some((text, time)) = self
            .latest_message()
            .map(|m| (m.text.clone(), m.timestamp))
        {
            self.last_message = text;
            self.last_message_time = Some(time);
        }
    }

    /// Finds a held message by its de-duplication key.
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.message_id == message_id)
    }
}
