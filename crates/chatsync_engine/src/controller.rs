//! Sync controller.
//!
//! Drives every remote operation against the helpdesk API and applies the
//! results to the [`ChatStore`]. Operations never return errors: failures
//! are reported through the [`Notifier`] and a sentinel return value, and
//! the store is left consistent.
//!
//! The store lock is never held across an `.await`, so each mutation runs to
//! completion before any other task observes the store.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::in_flight::InFlightSet;
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::poller::PollTask;
use crate::session::SessionProvider;
use crate::store::ChatStore;
use crate::transport::ChatTransport;
use chatsync_protocol::phone::{default_channel_id, require_phone};
use chatsync_protocol::{
    Chat, ChatId, ChatStatus, CreateChatRequest, Message, SendMessageRequest, StatusUpdateRequest,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

const MSG_LIST_FAILED: &str = "Erro ao carregar chats";
const MSG_CHAT_FAILED: &str = "Erro ao carregar conversa";
const MSG_CHAT_NOT_FOUND: &str = "Chat não encontrado";
const MSG_SEND_FAILED: &str = "Erro ao enviar mensagem";
const MSG_STATUS_UPDATED: &str = "Status atualizado com sucesso";
const MSG_STATUS_FAILED: &str = "Erro ao atualizar status";
const MSG_CREATE_FAILED: &str = "Erro ao processar chat";
const MSG_DEACTIVATED: &str = "Chat desativado com sucesso";
const MSG_DEACTIVATE_FAILED: &str = "Erro ao desativar chat";

/// Collaborators injected into a controller.
#[derive(Clone)]
pub struct SyncContext {
    /// Source of the credential and the signed-in agent.
    pub session: Arc<dyn SessionProvider>,
    /// Chat ids with an outstanding or cooling-down fetch.
    pub in_flight: InFlightSet,
    /// Receives user-visible notifications.
    pub notifier: Arc<dyn Notifier>,
}

impl SyncContext {
    /// Creates a context with a fresh in-flight set and a [`TracingNotifier`].
    pub fn new(session: Arc<dyn SessionProvider>) -> Self {
        Self {
            session,
            in_flight: InFlightSet::new(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Shares an existing in-flight set.
    pub fn with_in_flight(mut self, in_flight: InFlightSet) -> Self {
        self.in_flight = in_flight;
        self
    }

    /// Sets the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Result of [`SyncController::refresh_chat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The fetched chat was merged into the store.
    Applied,
    /// A fetch for the chat was already outstanding or cooling down.
    Skipped,
    /// The request failed; the store is unchanged.
    Failed,
}

/// Loading indicators for a UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncActivity {
    /// A list fetch is outstanding.
    pub loading_list: bool,
    /// Chat whose fetch started most recently and is still outstanding.
    pub loading_chat_id: Option<ChatId>,
    /// At least one send is outstanding.
    pub sending: bool,
}

/// Counters about controller operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Successful list fetches.
    pub list_fetches: u64,
    /// Successful chat fetches.
    pub chat_fetches: u64,
    /// Chat fetches skipped by the in-flight guard.
    pub skipped_fetches: u64,
    /// Messages confirmed by the server.
    pub messages_sent: u64,
    /// Optimistic messages rolled back.
    pub rollbacks: u64,
    /// Failed operations of any kind.
    pub failures: u64,
    /// Time of the last successful fetch.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct ActivityState {
    lists: usize,
    sends: usize,
    loading_chat_id: Option<ChatId>,
}

struct ControllerInner<T> {
    config: SyncConfig,
    transport: T,
    context: SyncContext,
    store: RwLock<ChatStore>,
    activity: Mutex<ActivityState>,
    stats: RwLock<SyncStats>,
    poll: Mutex<Option<PollTask>>,
    last_millis: AtomicI64,
}

/// Cloneable handle driving synchronization with the helpdesk.
///
/// Dropping the last handle stops polling.
pub struct SyncController<T: ChatTransport + 'static> {
    inner: Arc<ControllerInner<T>>,
}

impl<T: ChatTransport + 'static> Clone for SyncController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ChatTransport + 'static> SyncController<T> {
    /// Creates a controller with an empty store.
    pub fn new(config: SyncConfig, transport: T, context: SyncContext) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                config,
                transport,
                context,
                store: RwLock::new(ChatStore::new()),
                activity: Mutex::new(ActivityState::default()),
                stats: RwLock::new(SyncStats::default()),
                poll: Mutex::new(None),
                last_millis: AtomicI64::new(0),
            }),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// The session the controller was built with.
    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.inner.context.session
    }

    // -- read side ---------------------------------------------------------

    /// Snapshot of the chat list in display order.
    pub fn chats(&self) -> Vec<Chat> {
        self.inner.store.read().chats().to_vec()
    }

    /// Snapshot of the selected chat.
    pub fn selected(&self) -> Option<Chat> {
        self.inner.store.read().selected().cloned()
    }

    /// Id of the selected chat.
    pub fn selected_id(&self) -> Option<ChatId> {
        self.inner.store.read().selected_id()
    }

    /// Snapshot of one list entry.
    pub fn chat(&self, chat_id: ChatId) -> Option<Chat> {
        self.inner.store.read().chat(chat_id).cloned()
    }

    /// Store mutation counter.
    pub fn revision(&self) -> u64 {
        self.inner.store.read().revision()
    }

    /// Current loading indicators.
    pub fn activity(&self) -> SyncActivity {
        let state = self.inner.activity.lock();
        SyncActivity {
            loading_list: state.lists > 0,
            loading_chat_id: state.loading_chat_id,
            sending: state.sends > 0,
        }
    }

    /// Operation counters.
    pub fn stats(&self) -> SyncStats {
        self.inner.stats.read().clone()
    }

    /// Returns true while the selected chat is being polled.
    pub fn is_polling(&self) -> bool {
        self.inner
            .poll
            .lock()
            .as_ref()
            .is_some_and(PollTask::is_active)
    }

    // -- operations --------------------------------------------------------

    /// Replaces the chat list with the server's.
    pub async fn refresh_list(&self) -> bool {
        self.inner.activity.lock().lists += 1;
        let result = self.inner.transport.list_chats().await;
        self.inner.activity.lock().lists -= 1;

        match result {
            Ok(chats) => {
                debug!(count = chats.len(), "chat list fetched");
                self.inner.store.write().apply_list_fetch(chats);
                self.record_sync(|stats| stats.list_fetches += 1);
                true
            }
            Err(err) => {
                self.fail(MSG_LIST_FAILED, &err);
                false
            }
        }
    }

    /// Fetches one chat and merges it into the store.
    ///
    /// At most one fetch per chat is outstanding; the id stays reserved for
    /// the configured cool-down after the fetch completes.
    pub async fn refresh_chat(&self, chat_id: ChatId) -> FetchOutcome {
        self.inner.refresh_chat(chat_id).await
    }

    /// Sends a message, showing it immediately and rolling it back on failure.
    pub async fn send(&self, chat_id: ChatId, text: &str, from_me: bool) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let Some(phone) = self.inner.store.read().phone_of(chat_id).map(str::to_owned) else {
            self.fail(MSG_CHAT_NOT_FOUND, &SyncError::ChatNotFound(chat_id));
            return false;
        };

        let now = Utc::now();
        let millis = self.inner.next_millis(now.timestamp_millis());
        let message_id = format!("{phone}_{millis}");
        let pending = Message {
            id: -millis,
            message_id: message_id.clone(),
            chat_id,
            from_me,
            text: text.to_string(),
            timestamp: now,
            created_at: now,
        };

        self.inner
            .store
            .write()
            .apply_optimistic_send(chat_id, pending);
        debug!(chat_id, %message_id, "optimistic message applied");

        self.inner.activity.lock().sends += 1;
        let request = SendMessageRequest::new(text, message_id.clone(), from_me);
        let result = self.inner.transport.send_message(chat_id, &request).await;
        self.inner.activity.lock().sends -= 1;

        match result {
            Ok(response) => {
                let mut server_chat = response.chat;
                if server_chat.message(&response.message.message_id).is_none() {
                    server_chat.messages.push(response.message);
                }
                self.inner
                    .store
                    .write()
                    .reconcile_send(chat_id, &server_chat);
                self.inner.stats.write().messages_sent += 1;
                true
            }
            Err(err) => {
                self.inner
                    .store
                    .write()
                    .rollback_send(chat_id, &message_id);
                self.inner.stats.write().rollbacks += 1;
                self.fail(MSG_SEND_FAILED, &err);
                false
            }
        }
    }

    /// Changes a chat's business status once the server confirms it.
    pub async fn update_status(
        &self,
        chat_id: ChatId,
        status: ChatStatus,
        atendente_id: Option<String>,
    ) -> bool {
        let request = StatusUpdateRequest::new(status, atendente_id.clone());
        match self.inner.transport.update_status(chat_id, &request).await {
            Ok(_) => {
                self.inner
                    .store
                    .write()
                    .apply_status_change(chat_id, status, atendente_id);
                info!(chat_id, %status, "status updated");
                self.inner
                    .context
                    .notifier
                    .notify(Notification::success(MSG_STATUS_UPDATED));
                true
            }
            Err(err) => {
                self.fail(MSG_STATUS_FAILED, &err);
                false
            }
        }
    }

    /// Creates a chat for `phone` or finds the existing one.
    pub async fn create_or_find(&self, phone: &str, waha_id: &str, name: &str) -> Option<Chat> {
        let phone = match require_phone(phone) {
            Ok(phone) => phone,
            Err(err) => {
                self.fail(MSG_CREATE_FAILED, &SyncError::from(err));
                return None;
            }
        };

        let request = CreateChatRequest::new(phone, waha_id, name);
        match self.inner.transport.create_chat(&request).await {
            Ok(chat) => {
                info!(chat_id = chat.id, "chat created or found");
                self.inner.store.write().apply_create_or_find(chat.clone());
                Some(chat)
            }
            Err(err) => {
                self.fail(MSG_CREATE_FAILED, &err);
                None
            }
        }
    }

    /// Opens a chat for a saved contact.
    ///
    /// Without a channel id the contact's phone is addressed directly.
    pub async fn create_from_contact(
        &self,
        phone: &str,
        name: &str,
        waha_id: Option<&str>,
    ) -> Option<Chat> {
        let waha_id = match waha_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id.to_string(),
            None => match require_phone(phone) {
                Ok(digits) => default_channel_id(&digits),
                Err(err) => {
                    self.fail(MSG_CREATE_FAILED, &SyncError::from(err));
                    return None;
                }
            },
        };
        self.create_or_find(phone, &waha_id, name).await
    }

    /// Deactivates a chat and drops it from the store.
    pub async fn deactivate(&self, chat_id: ChatId) -> bool {
        match self.inner.transport.deactivate_chat(chat_id).await {
            Ok(()) => {
                let was_selected = {
                    let mut store = self.inner.store.write();
                    let was_selected = store.selected_id() == Some(chat_id);
                    store.remove_chat(chat_id);
                    was_selected
                };
                if was_selected {
                    self.stop_polling();
                }
                info!(chat_id, "chat deactivated");
                self.inner
                    .context
                    .notifier
                    .notify(Notification::success(MSG_DEACTIVATED));
                true
            }
            Err(err) => {
                self.fail(MSG_DEACTIVATE_FAILED, &err);
                false
            }
        }
    }

    /// Selects a chat and starts polling it.
    ///
    /// The held list data is shown at once; the first poll tick fetches the
    /// chat immediately. Must be called within a tokio runtime.
    pub fn select(&self, chat_id: ChatId) -> bool {
        if !self.inner.store.write().select(chat_id) {
            debug!(chat_id, "select ignored for unknown chat");
            return false;
        }

        let weak: Weak<ControllerInner<T>> = Arc::downgrade(&self.inner);
        let task = PollTask::spawn(chat_id, self.inner.config.poll_interval, move || {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            tokio::spawn(async move {
                inner.refresh_chat(chat_id).await;
            });
            true
        });

        let previous = self.inner.poll.lock().replace(task);
        drop(previous);
        info!(chat_id, "chat selected");
        true
    }

    /// Clears the selection and stops polling.
    pub fn clear_selection(&self) {
        self.stop_polling();
        self.inner.store.write().clear_selection();
    }

    /// Changes the polling interval of the selected chat.
    pub fn set_poll_interval(&self, interval: Duration) -> bool {
        self.inner
            .poll
            .lock()
            .as_ref()
            .is_some_and(|task| task.set_interval(interval))
    }

    /// Stops polling. Outstanding requests still complete and are applied.
    pub fn shutdown(&self) {
        self.stop_polling();
        debug!("controller shut down");
    }

    fn stop_polling(&self) {
        let task = self.inner.poll.lock().take();
        drop(task);
    }

    fn record_sync<F: FnOnce(&mut SyncStats)>(&self, update: F) {
        self.inner.record_sync(update);
    }

    fn fail(&self, message: &str, err: &SyncError) {
        self.inner.fail(message, err);
    }
}

impl<T: ChatTransport + 'static> ControllerInner<T> {
    async fn refresh_chat(&self, chat_id: ChatId) -> FetchOutcome {
        if !self.context.in_flight.try_acquire(chat_id) {
            debug!(chat_id, "fetch already in flight");
            self.stats.write().skipped_fetches += 1;
            return FetchOutcome::Skipped;
        }

        self.activity.lock().loading_chat_id = Some(chat_id);
        let result = self.transport.get_chat(chat_id).await;
        {
            let mut activity = self.activity.lock();
            if activity.loading_chat_id == Some(chat_id) {
                activity.loading_chat_id = None;
            }
        }
        self.release_after_cooldown(chat_id);

        match result {
            Ok(chat) => {
                self.store.write().apply_chat_fetch(chat);
                self.record_sync(|stats| stats.chat_fetches += 1);
                debug!(chat_id, "chat fetch applied");
                FetchOutcome::Applied
            }
            Err(err) => {
                self.fail(MSG_CHAT_FAILED, &err);
                FetchOutcome::Failed
            }
        }
    }

    fn release_after_cooldown(&self, chat_id: ChatId) {
        let cooldown = self.config.fetch_cooldown;
        if cooldown.is_zero() {
            self.context.in_flight.release(chat_id);
            return;
        }
        let in_flight = self.context.in_flight.clone();
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            in_flight.release(chat_id);
        });
    }

    fn next_millis(&self, now: i64) -> i64 {
        let mut last = self.last_millis.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match self
                .last_millis
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    fn record_sync<F: FnOnce(&mut SyncStats)>(&self, update: F) {
        let mut stats = self.stats.write();
        update(&mut stats);
        stats.last_sync_time = Some(Utc::now());
        stats.last_error = None;
    }

    fn fail(&self, message: &str, err: &SyncError) {
        warn!(error = %err, "{message}");
        {
            let mut stats = self.stats.write();
            stats.failures += 1;
            stats.last_error = Some(err.to_string());
        }
        self.context.notifier.notify(Notification::error(message));
    }
}
