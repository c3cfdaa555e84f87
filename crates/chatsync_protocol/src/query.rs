//! Read-only queries over chat lists: filtering, search, ordering, stats.

use crate::model::{Chat, ChatStatus};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// Ordering applied by [`sort_chats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Most recent message first.
    #[default]
    Recent,
    /// Alphabetical by customer name.
    Name,
    /// Workflow order of the status.
    Status,
}

/// Orders chats by `last_message_time` descending; chats without a time go last.
pub fn compare_recent(a: &Chat, b: &Chat) -> Ordering {
    match (a.last_message_time, b.last_message_time) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Returns a sorted copy of `chats`. The sort is stable.
pub fn sort_chats(chats: &[Chat], sort_by: SortBy) -> Vec<Chat> {
    let mut sorted = chats.to_vec();
    match sort_by {
        SortBy::Recent => sorted.sort_by(compare_recent),
        SortBy::Name => sorted.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        SortBy::Status => sorted.sort_by_key(|c| c.status.rank()),
    }
    sorted
}

/// Chats with the given status, in their current order.
pub fn filter_by_status(chats: &[Chat], status: ChatStatus) -> Vec<&Chat> {
    chats.iter().filter(|c| c.status == status).collect()
}

/// Case-insensitive search over name, phone and last message.
///
/// A blank term matches every chat.
pub fn search<'a>(chats: &'a [Chat], term: &str) -> Vec<&'a Chat> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return chats.iter().collect();
    }
    chats
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&term)
                || c.phone.contains(&term)
                || c.last_message.to_lowercase().contains(&term)
        })
        .collect()
}

/// Shortens `text` to `max_chars` characters, appending `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Message counts and timing for one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatStats {
    /// All held messages.
    pub total_messages: usize,
    /// Messages from the customer.
    pub user_messages: usize,
    /// Messages from agents.
    pub agent_messages: usize,
    /// Timestamp of the first held message.
    pub first_message_time: Option<DateTime<Utc>>,
    /// The chat's last message time.
    pub last_message_time: Option<DateTime<Utc>>,
    /// Time between first held message and last message.
    pub duration: Duration,
}

impl ChatStats {
    /// Computes stats for `chat`.
    pub fn of(chat: &Chat) -> Self {
        let agent_messages = chat.messages.iter().filter(|m| m.from_me).count();
        let first_message_time = chat.messages.first().map(|m| m.timestamp);
        let duration = match (first_message_time, chat.last_message_time) {
            (Some(first), Some(last)) => last - first,
            _ => Duration::zero(),
        };
        Self {
            total_messages: chat.messages.len(),
            user_messages: chat.messages.len() - agent_messages,
            agent_messages,
            first_message_time,
            last_message_time: chat.last_message_time,
            duration,
        }
    }
}
