//! Message merge engine.
//!
//! Messages reach a chat through four paths: the list fetch, the per-chat
//! fetch, polling, and the response to a send. All of them are combined here
//! so that each logical message appears exactly once.
//!
//! ## Rules
//!
//! - Identity is the `message_id`; the numeric `id` is only used when the
//!   `message_id` is empty (pending ids do not survive reconciliation).
//! - For a given key the last writer wins and `incoming` is applied after
//!   `existing`, so a server copy supersedes a pending placeholder.
//! - A key keeps the position of its first appearance; the result is then
//!   stable-sorted by timestamp.

use chatsync_protocol::Message;
use std::collections::HashMap;

/// De-duplication key of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Keyed by `message_id`.
    MessageId(String),
    /// Keyed by numeric id (empty `message_id`).
    Id(i64),
}

impl MessageKey {
    /// Derives the key of `message`.
    pub fn of(message: &Message) -> Self {
        if message.message_id.is_empty() {
            MessageKey::Id(message.id)
        } else {
            MessageKey::MessageId(message.message_id.clone())
        }
    }
}

/// Combines two message collections into one de-duplicated, time-ordered one.
pub fn merge(existing: &[Message], incoming: &[Message]) -> Vec<Message> {
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    let mut positions: HashMap<MessageKey, usize> = HashMap::with_capacity(merged.capacity());

    for message in existing.iter().chain(incoming) {
        match positions.get(&MessageKey::of(message)) {
            Some(&index) => merged[index] = message.clone(),
            None => {
                positions.insert(MessageKey::of(message), merged.len());
                merged.push(message.clone());
            }
        }
    }

    merged.sort_by_key(|m| m.timestamp);
    merged
}

/// Merges `incoming` into `messages` in place.
pub fn merge_into(messages: &mut Vec<Message>, incoming: &[Message]) {
    *messages = merge(messages, incoming);
}

/// Removes every message with the given `message_id`. Returns how many were removed.
pub fn remove_by_message_id(messages: &mut Vec<Message>, message_id: &str) -> usize {
    let before = messages.len();
    messages.retain(|m| m.message_id != message_id);
    before - messages.len()
}
