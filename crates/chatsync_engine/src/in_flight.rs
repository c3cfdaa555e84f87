//! Set of chat ids with an outstanding fetch.

use chatsync_protocol::ChatId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared set of chat ids whose fetch is outstanding or cooling down.
///
/// Cloning yields a handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    ids: Arc<Mutex<HashSet<ChatId>>>,
}

impl InFlightSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `chat_id` as in flight. Returns false if it already was.
    pub fn try_acquire(&self, chat_id: ChatId) -> bool {
        self.ids.lock().insert(chat_id)
    }

    /// Releases `chat_id`.
    pub fn release(&self, chat_id: ChatId) {
        self.ids.lock().remove(&chat_id);
    }

    /// Returns true if `chat_id` is marked.
    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.ids.lock().contains(&chat_id)
    }

    /// Number of marked ids.
    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    /// Returns true if nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}
