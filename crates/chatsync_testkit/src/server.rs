//! In-memory helpdesk server.
//!
//! [`FakeHelpdesk`] implements [`ChatTransport`] against an in-process chat
//! table, so controller tests run without HTTP. Fetches of a chat can be held
//! open to stage response races deterministically.

use async_trait::async_trait;
use chatsync_engine::{ChatTransport, Endpoint, SyncError, SyncResult};
use chatsync_protocol::phone::normalize_phone;
use chatsync_protocol::{
    Chat, ChatId, CreateChatRequest, Message, SendMessageRequest, SendMessageResponse,
    StatusUpdateRequest,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// An in-memory helpdesk API.
#[derive(Debug)]
pub struct FakeHelpdesk {
    chats: Mutex<BTreeMap<ChatId, Chat>>,
    calls: Mutex<Vec<Endpoint>>,
    gates: Mutex<HashMap<ChatId, Arc<Semaphore>>>,
    send_gates: Mutex<HashMap<ChatId, Arc<Semaphore>>>,
    fail_next: Mutex<Option<String>>,
    offline: AtomicBool,
    next_chat_id: AtomicI64,
    next_message_id: AtomicI64,
}

impl Default for FakeHelpdesk {
    fn default() -> Self {
        Self {
            chats: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
            send_gates: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(None),
            offline: AtomicBool::new(false),
            next_chat_id: AtomicI64::new(1000),
            next_message_id: AtomicI64::new(10_000),
        }
    }
}

impl FakeHelpdesk {
    /// Creates an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a server holding `chats`.
    pub fn with_chats(chats: Vec<Chat>) -> Self {
        let server = Self::new();
        for chat in chats {
            server.insert_chat(chat);
        }
        server
    }

    /// Inserts or replaces a chat.
    pub fn insert_chat(&self, chat: Chat) {
        self.chats.lock().insert(chat.id, chat);
    }

    /// Server-side copy of a chat.
    pub fn chat(&self, chat_id: ChatId) -> Option<Chat> {
        self.chats.lock().get(&chat_id).cloned()
    }

    /// Simulates a customer message arriving on the channel.
    pub fn receive(&self, chat_id: ChatId, text: &str) -> Option<Message> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let mut chats = self.chats.lock();
        let chat = chats.get_mut(&chat_id)?;
        let now = Utc::now();
        let message = Message {
            id,
            message_id: format!("in_{id}"),
            chat_id,
            from_me: false,
            text: text.to_string(),
            timestamp: now,
            created_at: now,
        };
        chat.messages.push(message.clone());
        chat.refresh_last_message();
        Some(message)
    }

    /// Endpoints called so far, in order.
    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `endpoint`.
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls.lock().iter().filter(|e| **e == endpoint).count()
    }

    /// Makes every call fail with a retryable transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes the next call fail with a server error.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }

    /// Holds every subsequent fetch of `chat_id` until released.
    pub fn hold_fetches(&self, chat_id: ChatId) {
        self.gates
            .lock()
            .insert(chat_id, Arc::new(Semaphore::new(0)));
    }

    /// Lets one held fetch of `chat_id` complete.
    pub fn release_fetch(&self, chat_id: ChatId) {
        if let Some(gate) = self.gates.lock().get(&chat_id) {
            gate.add_permits(1);
        }
    }

    /// Releases all held fetches of `chat_id` and stops holding new ones.
    pub fn open_fetches(&self, chat_id: ChatId) {
        if let Some(gate) = self.gates.lock().remove(&chat_id) {
            gate.close();
        }
    }

    /// Holds every subsequent send to `chat_id` until released.
    ///
    /// A held send is recorded at once; offline and injected failures are
    /// decided when it is released.
    pub fn hold_sends(&self, chat_id: ChatId) {
        self.send_gates
            .lock()
            .insert(chat_id, Arc::new(Semaphore::new(0)));
    }

    /// Lets one held send to `chat_id` complete.
    pub fn release_send(&self, chat_id: ChatId) {
        if let Some(gate) = self.send_gates.lock().get(&chat_id) {
            gate.add_permits(1);
        }
    }

    fn record(&self, endpoint: Endpoint) -> SyncResult<()> {
        self.calls.lock().push(endpoint);
        self.check_failures(endpoint)
    }

    fn check_failures(&self, endpoint: Endpoint) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable(format!(
                "{endpoint}: connection refused"
            )));
        }
        if let Some(message) = self.fail_next.lock().take() {
            return Err(SyncError::Server(message));
        }
        Ok(())
    }

    fn with_chat<R>(&self, chat_id: ChatId, f: impl FnOnce(&mut Chat) -> R) -> SyncResult<R> {
        self.chats
            .lock()
            .get_mut(&chat_id)
            .filter(|chat| chat.is_active)
            .map(f)
            .ok_or_else(|| SyncError::Server(format!("chat {chat_id} not found")))
    }
}

async fn pass_gate(gates: &Mutex<HashMap<ChatId, Arc<Semaphore>>>, chat_id: ChatId) {
    let gate = gates.lock().get(&chat_id).cloned();
    if let Some(gate) = gate {
        // A closed gate lets the call through.
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl ChatTransport for FakeHelpdesk {
    async fn list_chats(&self) -> SyncResult<Vec<Chat>> {
        self.record(Endpoint::ListChats)?;
        Ok(self
            .chats
            .lock()
            .values()
            .filter(|chat| chat.is_active)
            .cloned()
            .collect())
    }

    async fn get_chat(&self, chat_id: ChatId) -> SyncResult<Chat> {
        self.record(Endpoint::GetChat(chat_id))?;
        // The response reflects the server at request time; a held fetch
        // delivers it late.
        let snapshot = self.with_chat(chat_id, |chat| chat.clone());

        pass_gate(&self.gates, chat_id).await;
        snapshot
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        request: &SendMessageRequest,
    ) -> SyncResult<SendMessageResponse> {
        let endpoint = Endpoint::SendMessage(chat_id);
        self.calls.lock().push(endpoint);
        pass_gate(&self.send_gates, chat_id).await;
        self.check_failures(endpoint)?;

        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.with_chat(chat_id, |chat| {
            let now = Utc::now();
            let message = Message {
                id,
                message_id: request.message_id.clone(),
                chat_id,
                from_me: request.from_me,
                text: request.text.clone(),
                timestamp: now,
                created_at: now,
            };
            chat.messages.push(message.clone());
            chat.refresh_last_message();
            SendMessageResponse {
                message,
                chat: chat.clone(),
            }
        })
    }

    async fn update_status(
        &self,
        chat_id: ChatId,
        request: &StatusUpdateRequest,
    ) -> SyncResult<Chat> {
        self.record(Endpoint::UpdateStatus(chat_id))?;
        self.with_chat(chat_id, |chat| {
            chat.status = request.status;
            chat.atendente_id = request.atendente_id.clone();
            chat.updated_at = Some(Utc::now());
            chat.clone()
        })
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> SyncResult<Chat> {
        self.record(Endpoint::CreateChat)?;
        let phone = normalize_phone(&request.phone);
        let mut chats = self.chats.lock();
        if let Some(existing) = chats
            .values()
            .find(|chat| chat.is_active && normalize_phone(&chat.phone) == phone)
        {
            return Ok(existing.clone());
        }

        let id = self.next_chat_id.fetch_add(1, Ordering::SeqCst);
        let mut chat = Chat::new(id, request.waha_id.clone(), request.name.clone(), phone);
        chat.created_at = Some(Utc::now());
        chats.insert(id, chat.clone());
        Ok(chat)
    }

    async fn deactivate_chat(&self, chat_id: ChatId) -> SyncResult<()> {
        self.record(Endpoint::DeactivateChat(chat_id))?;
        self.with_chat(chat_id, |chat| chat.is_active = false)
    }
}
