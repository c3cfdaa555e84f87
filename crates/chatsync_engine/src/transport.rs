//! Transport layer abstraction for the helpdesk API.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use chatsync_protocol::{
    Chat, ChatId, CreateChatRequest, SendMessageRequest, SendMessageResponse, StatusUpdateRequest,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A chat transport performs authenticated calls against the helpdesk API.
///
/// This trait abstracts the network layer, allowing for different implementations
/// (HTTP, in-memory fakes for testing, etc.).
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Fetches every chat (`GET /chats`).
    async fn list_chats(&self) -> SyncResult<Vec<Chat>>;

    /// Fetches one chat with its messages (`GET /chats/{id}`).
    async fn get_chat(&self, chat_id: ChatId) -> SyncResult<Chat>;

    /// Sends a message (`POST /chats/{id}/message`).
    async fn send_message(
        &self,
        chat_id: ChatId,
        request: &SendMessageRequest,
    ) -> SyncResult<SendMessageResponse>;

    /// Changes the chat status (`PUT /chats/{id}/status`).
    async fn update_status(&self, chat_id: ChatId, request: &StatusUpdateRequest)
        -> SyncResult<Chat>;

    /// Creates a chat or finds the existing one for the phone (`POST /chats`).
    async fn create_chat(&self, request: &CreateChatRequest) -> SyncResult<Chat>;

    /// Deactivates a chat (`DELETE /chats/{id}`).
    async fn deactivate_chat(&self, chat_id: ChatId) -> SyncResult<()>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for std::sync::Arc<T> {
    async fn list_chats(&self) -> SyncResult<Vec<Chat>> {
        (**self).list_chats().await
    }

    async fn get_chat(&self, chat_id: ChatId) -> SyncResult<Chat> {
        (**self).get_chat(chat_id).await
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        request: &SendMessageRequest,
    ) -> SyncResult<SendMessageResponse> {
        (**self).send_message(chat_id, request).await
    }

    async fn update_status(
        &self,
        chat_id: ChatId,
        request: &StatusUpdateRequest,
    ) -> SyncResult<Chat> {
        (**self).update_status(chat_id, request).await
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> SyncResult<Chat> {
        (**self).create_chat(request).await
    }

    async fn deactivate_chat(&self, chat_id: ChatId) -> SyncResult<()> {
        (**self).deactivate_chat(chat_id).await
    }
}

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// API endpoints consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /chats`
    ListChats,
    /// `GET /chats/{id}`
    GetChat(ChatId),
    /// `POST /chats/{id}/message`
    SendMessage(ChatId),
    /// `PUT /chats/{id}/status`
    UpdateStatus(ChatId),
    /// `POST /chats`
    CreateChat,
    /// `DELETE /chats/{id}`
    DeactivateChat(ChatId),
}

impl Endpoint {
    /// HTTP method of the endpoint.
    pub fn method(&self) -> Method {
        match self {
            Endpoint::ListChats | Endpoint::GetChat(_) => Method::Get,
            Endpoint::SendMessage(_) | Endpoint::CreateChat => Method::Post,
            Endpoint::UpdateStatus(_) => Method::Put,
            Endpoint::DeactivateChat(_) => Method::Delete,
        }
    }

    /// Path relative to the API base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::ListChats | Endpoint::CreateChat => "/chats".to_string(),
            Endpoint::GetChat(id) | Endpoint::DeactivateChat(id) => format!("/chats/{id}"),
            Endpoint::SendMessage(id) => format!("/chats/{id}/message"),
            Endpoint::UpdateStatus(id) => format!("/chats/{id}/status"),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method().as_str(), self.path())
    }
}

/// A mock transport for testing.
#[derive(Debug, Default)]
pub struct MockTransport {
    offline: AtomicBool,
    list_response: Mutex<Option<Vec<Chat>>>,
    chat_responses: Mutex<HashMap<ChatId, Chat>>,
    send_response: Mutex<Option<SendMessageResponse>>,
    status_response: Mutex<Option<Chat>>,
    create_response: Mutex<Option<Chat>>,
    calls: Mutex<Vec<Endpoint>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the list response.
    pub fn set_list_response(&self, chats: Vec<Chat>) {
        *self.list_response.lock() = Some(chats);
    }

    /// Sets the response for one chat fetch.
    pub fn set_chat_response(&self, chat: Chat) {
        self.chat_responses.lock().insert(chat.id, chat);
    }

    /// Sets the send response.
    pub fn set_send_response(&self, response: SendMessageResponse) {
        *self.send_response.lock() = Some(response);
    }

    /// Sets the status update response.
    pub fn set_status_response(&self, chat: Chat) {
        *self.status_response.lock() = Some(chat);
    }

    /// Sets the create-or-find response.
    pub fn set_create_response(&self, chat: Chat) {
        *self.create_response.lock() = Some(chat);
    }

    /// Makes every call fail with a retryable transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Endpoints called so far, in order.
    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().clone()
    }

    fn record(&self, endpoint: Endpoint) -> SyncResult<()> {
        self.calls.lock().push(endpoint);
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable(format!("{endpoint}: offline")));
        }
        Ok(())
    }

    fn missing(endpoint: Endpoint) -> SyncError {
        SyncError::Server(format!("no mock response set for {endpoint}"))
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn list_chats(&self) -> SyncResult<Vec<Chat>> {
        self.record(Endpoint::ListChats)?;
        self.list_response
            .lock()
            .clone()
            .ok_or_else(|| Self::missing(Endpoint::ListChats))
    }

    async fn get_chat(&self, chat_id: ChatId) -> SyncResult<Chat> {
        let endpoint = Endpoint::GetChat(chat_id);
        self.record(endpoint)?;
        self.chat_responses
            .lock()
            .get(&chat_id)
            .cloned()
            .ok_or_else(|| Self::missing(endpoint))
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        _request: &SendMessageRequest,
    ) -> SyncResult<SendMessageResponse> {
        let endpoint = Endpoint::SendMessage(chat_id);
        self.record(endpoint)?;
        self.send_response
            .lock()
            .clone()
            .ok_or_else(|| Self::missing(endpoint))
    }

    async fn update_status(
        &self,
        chat_id: ChatId,
        _request: &StatusUpdateRequest,
    ) -> SyncResult<Chat> {
        let endpoint = Endpoint::UpdateStatus(chat_id);
        self.record(endpoint)?;
        self.status_response
            .lock()
            .clone()
            .ok_or_else(|| Self::missing(endpoint))
    }

    async fn create_chat(&self, _request: &CreateChatRequest) -> SyncResult<Chat> {
        self.record(Endpoint::CreateChat)?;
        self.create_response
            .lock()
            .clone()
            .ok_or_else(|| Self::missing(Endpoint::CreateChat))
    }

    async fn deactivate_chat(&self, chat_id: ChatId) -> SyncResult<()> {
        self.record(Endpoint::DeactivateChat(chat_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::ListChats.path(), "/chats");
        assert_eq!(Endpoint::GetChat(4).path(), "/chats/4");
        assert_eq!(Endpoint::SendMessage(4).to_string(), "POST /chats/4/message");
        assert_eq!(Endpoint::UpdateStatus(4).to_string(), "PUT /chats/4/status");
        assert_eq!(Endpoint::CreateChat.to_string(), "POST /chats");
        assert_eq!(Endpoint::DeactivateChat(4).to_string(), "DELETE /chats/4");
    }

    #[tokio::test]
    async fn mock_transport_offline_error() {
        let transport = MockTransport::new();
        transport.set_list_response(vec![]);
        transport.set_offline(true);

        let result = transport.list_chats().await;
        assert!(matches!(result, Err(SyncError::Transport { retryable: true, .. })));
        assert_eq!(transport.calls(), vec![Endpoint::ListChats]);
    }

    #[tokio::test]
    async fn mock_transport_missing_response() {
        let transport = MockTransport::new();
        let result = transport.get_chat(3).await;
        assert!(matches!(result, Err(SyncError::Server(_))));
    }

    #[tokio::test]
    async fn mock_transport_chat_response() {
        let transport = MockTransport::new();
        transport.set_chat_response(Chat::new(3, "w", "n", "1"));
        let chat = transport.get_chat(3).await.unwrap();
        assert_eq!(chat.id, 3);
        assert!(transport.deactivate_chat(3).await.is_ok());
    }
}
