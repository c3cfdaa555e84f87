//! Request and response bodies for the helpdesk REST API.

use crate::error::{ProtocolError, ProtocolResult};
use crate::model::{Chat, ChatStatus, Message};
use serde::{Deserialize, Serialize};

/// Uniform response wrapper returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the server handled the request.
    pub success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Creates a successful envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed envelope.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Converts the envelope into its payload.
    ///
    /// A successful envelope without data is malformed.
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if !self.success {
            return Err(EnvelopeError::Rejected(
                self.error.unwrap_or_else(|| "request rejected".into()),
            ));
        }
        self.data.ok_or_else(|| {
            EnvelopeError::Malformed(ProtocolError::MalformedEnvelope(
                "success without data".into(),
            ))
        })
    }

    /// Checks the envelope without requiring a payload.
    pub fn into_unit(self) -> Result<(), EnvelopeError> {
        if self.success {
            Ok(())
        } else {
            Err(EnvelopeError::Rejected(
                self.error.unwrap_or_else(|| "request rejected".into()),
            ))
        }
    }
}

/// Why an envelope did not yield a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The server reported `success: false`.
    Rejected(String),
    /// The envelope shape was invalid.
    Malformed(ProtocolError),
}

/// Body of `POST /chats/{id}/message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Message text, already trimmed.
    pub text: String,
    /// Client-assigned de-duplication key.
    pub message_id: String,
    /// Whether the helpdesk side is the sender.
    pub from_me: bool,
}

impl SendMessageRequest {
    /// Creates a new send request.
    pub fn new(text: impl Into<String>, message_id: impl Into<String>, from_me: bool) -> Self {
        Self {
            text: text.into(),
            message_id: message_id.into(),
            from_me,
        }
    }
}

/// Payload returned by `POST /chats/{id}/message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// The server-confirmed message.
    pub message: Message,
    /// The chat after the message was stored.
    pub chat: Chat,
}

/// Body of `PUT /chats/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    /// Requested status.
    pub status: ChatStatus,
    /// Agent taking over the chat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atendente_id: Option<String>,
}

impl StatusUpdateRequest {
    /// Creates a new status update request.
    pub fn new(status: ChatStatus, atendente_id: Option<String>) -> Self {
        Self {
            status,
            atendente_id,
        }
    }
}

/// Body of `POST /chats` (create or find by phone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    /// Digits-only phone.
    pub phone: String,
    /// External channel id.
    pub waha_id: String,
    /// Customer display name.
    pub name: String,
}

impl CreateChatRequest {
    /// Creates a new create-or-find request.
    pub fn new(
        phone: impl Into<String>,
        waha_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            phone: phone.into(),
            waha_id: waha_id.into(),
            name: name.into(),
        }
    }
}

/// Parses an envelope from a JSON body.
pub fn decode_envelope<T>(body: &[u8]) -> ProtocolResult<ApiEnvelope<T>>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(body).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
}
