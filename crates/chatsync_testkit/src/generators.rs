//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains the store's invariants.

use crate::fixtures::at;
use chatsync_engine::MessageKey;
use chatsync_protocol::{ChatId, ChatStatus, Message};
use proptest::prelude::*;
use std::collections::HashSet;

/// Strategy for a message key: empty (legacy) a third of the time.
pub fn message_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(String::new()),
        2 => prop::string::string_regex("[a-z0-9]{1,6}").expect("Invalid regex"),
    ]
}

/// Strategy for one message in `chat_id`.
///
/// Ids may be negative (pending) and timestamps collide often so that
/// tie-breaking is exercised.
pub fn message_strategy(chat_id: ChatId) -> impl Strategy<Value = Message> {
    (
        -50i64..500,
        message_id_strategy(),
        any::<bool>(),
        prop::string::string_regex("[A-Za-z ]{0,12}").expect("Invalid regex"),
        0i64..40,
    )
        .prop_map(move |(id, message_id, from_me, text, secs)| Message {
            id,
            message_id,
            chat_id,
            from_me,
            text,
            timestamp: at(secs),
            created_at: at(secs),
        })
}

/// Strategy for messages whose merge keys are pairwise distinct.
pub fn unique_messages_strategy(
    chat_id: ChatId,
    max_len: usize,
) -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(message_strategy(chat_id), 0..=max_len).prop_map(dedup_by_key)
}

/// Strategy for a held message list: unique keys, ascending by timestamp.
pub fn held_messages_strategy(
    chat_id: ChatId,
    max_len: usize,
) -> impl Strategy<Value = Vec<Message>> {
    unique_messages_strategy(chat_id, max_len).prop_map(|mut messages| {
        messages.sort_by_key(|m| m.timestamp);
        messages
    })
}

/// Strategy for two message lists that share no merge key.
pub fn disjoint_messages_strategy(
    chat_id: ChatId,
    max_len: usize,
) -> impl Strategy<Value = (Vec<Message>, Vec<Message>)> {
    unique_messages_strategy(chat_id, max_len)
        .prop_flat_map(|messages| {
            let len = messages.len();
            (Just(messages), 0..=len)
        })
        .prop_map(|(mut messages, split)| {
            let incoming = messages.split_off(split);
            messages.sort_by_key(|m| m.timestamp);
            (messages, incoming)
        })
}

/// Strategy for pending messages and a server response confirming some of them.
///
/// Every held message is pending with a non-empty `message_id`. The incoming
/// list starts with confirmed copies of at least one of them (same
/// `message_id`, server id, changed text, later timestamp) followed by
/// messages the server holds that were never held locally.
pub fn confirmed_overlap_strategy(
    chat_id: ChatId,
    max_len: usize,
) -> impl Strategy<Value = (Vec<Message>, Vec<Message>)> {
    disjoint_messages_strategy(chat_id, max_len)
        .prop_flat_map(|(held, extra)| {
            let len = held.len();
            (Just(held), Just(extra), prop::collection::vec(any::<bool>(), len))
        })
        .prop_map(|(mut held, extra, mut confirm)| {
            for (index, message) in held.iter_mut().enumerate() {
                message.id = -(index as i64) - 1;
                message.message_id = format!("pending-{index}");
            }
            if let Some(first) = confirm.first_mut() {
                *first = true;
            }

            let mut incoming: Vec<Message> = held
                .iter()
                .zip(&confirm)
                .filter(|(_, confirmed)| **confirmed)
                .map(|(pending, _)| Message {
                    id: 1000 - pending.id,
                    text: format!("{} (confirmed)", pending.text),
                    timestamp: pending.timestamp + chrono::Duration::seconds(1),
                    ..pending.clone()
                })
                .collect();
            incoming.extend(extra);
            (held, incoming)
        })
}

/// Strategy for a chat status.
pub fn chat_status_strategy() -> impl Strategy<Value = ChatStatus> {
    prop::sample::select(ChatStatus::ALL.to_vec())
}

/// Strategy for a phone typed by an agent: digits mixed with formatting.
pub fn typed_phone_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"\+?[0-9 ()\-]{0,20}").expect("Invalid regex")
}

fn dedup_by_key(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(MessageKey::of(m)))
        .collect()
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to a proptest configuration.
    pub fn to_proptest(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
