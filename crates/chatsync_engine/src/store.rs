//! In-memory chat store.
//!
//! Holds the chat list and the selected chat. The selected chat is a second
//! copy of a list entry, so every mutation writes both copies. Writes to the
//! selected copy go through an identity guard: a response for a chat the user
//! has navigated away from never replaces the newly selected chat.
//!
//! The list is only re-sorted by [`ChatStore::apply_list_fetch`]; incremental
//! updates keep each chat at its current position until the next refresh.

use crate::merge::{merge, remove_by_message_id};
use chatsync_protocol::query::compare_recent;
use chatsync_protocol::{Chat, ChatId, ChatStatus, Message};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Summary a chat showed before a pending message replaced it.
#[derive(Debug, Clone)]
struct PriorPreview {
    chat_id: ChatId,
    last_message: String,
    last_message_time: Option<DateTime<Utc>>,
}

/// Authoritative local copy of the chat list and the open conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatStore {
    chats: Vec<Chat>,
    selected: Option<Chat>,
    previews: HashMap<String, PriorPreview>,
    revision: u64,
}

impl ChatStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chats in display order.
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    /// The selected chat, if any.
    pub fn selected(&self) -> Option<&Chat> {
        self.selected.as_ref()
    }

    /// Id of the selected chat, if any.
    pub fn selected_id(&self) -> Option<ChatId> {
        self.selected.as_ref().map(|c| c.id)
    }

    /// Looks up a list entry.
    pub fn chat(&self, chat_id: ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    /// Counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the list wholesale, sorted by last message time descending.
    ///
    /// The selection is left untouched.
    pub fn apply_list_fetch(&mut self, mut chats: Vec<Chat>) {
        chats.sort_by(compare_recent);
        self.chats = chats;
        self.bump();
    }

    /// Merges a freshly fetched chat into the store.
    ///
    /// The server's scalar fields win; its messages are merged with the held
    /// ones. The selected copy is only written if it holds the same id.
    pub fn apply_chat_fetch(&mut self, mut fetched: Chat) {
        let held = self
            .chat(fetched.id)
            .or_else(|| self.selected.as_ref().filter(|c| c.id == fetched.id))
            .map(|c| c.messages.as_slice())
            .unwrap_or_default();

        fetched.messages = merge(held, &fetched.messages);
        fetched.refresh_last_message();

        if let Some(entry) = self.entry_mut(fetched.id) {
            *entry = fetched.clone();
        }
        if let Some(selected) = self.selected_mut(fetched.id) {
            *selected = fetched;
        }
        self.bump();
    }

    /// Shows a locally synthesized message before the server confirms it.
    pub fn apply_optimistic_send(&mut self, chat_id: ChatId, message: Message) {
        let prior = self
            .chat(chat_id)
            .or_else(|| self.selected.as_ref().filter(|c| c.id == chat_id))
            .map(|c| PriorPreview {
                chat_id,
                last_message: c.last_message.clone(),
                last_message_time: c.last_message_time,
            });
        if let Some(prior) = prior {
            self.previews.insert(message.message_id.clone(), prior);
        }

        let pending = std::slice::from_ref(&message);
        self.update_both(chat_id, |chat| {
            chat.messages = merge(&chat.messages, pending);
            chat.last_message = message.text.clone();
            chat.last_message_time = Some(message.timestamp);
        });
    }

    /// Merges the server's view of a chat after a successful send.
    ///
    /// The confirmed message shares its `message_id` with the pending
    /// placeholder and replaces it.
    pub fn reconcile_send(&mut self, chat_id: ChatId, server_chat: &Chat) {
        self.update_both(chat_id, |chat| {
            chat.messages = merge(&chat.messages, &server_chat.messages);
            chat.refresh_last_message();
        });
        self.previews.retain(|message_id, prior| {
            prior.chat_id != chat_id || server_chat.message(message_id).is_none()
        });
    }

    /// Removes a pending message after its send failed.
    ///
    /// The summary is recomputed from the remaining messages. When none of
    /// them is newer than the summary shown before the send, that summary is
    /// restored.
    pub fn rollback_send(&mut self, chat_id: ChatId, message_id: &str) {
        let prior = self.previews.remove(message_id);
        self.update_both(chat_id, |chat| {
            if remove_by_message_id(&mut chat.messages, message_id) == 0 {
                return;
            }
            chat.refresh_last_message();
            if let Some(prior) = &prior {
                let newer_held = chat
                    .latest_message()
                    .is_some_and(|m| Some(m.timestamp) >= prior.last_message_time);
                if !newer_held {
                    chat.last_message = prior.last_message.clone();
                    chat.last_message_time = prior.last_message_time;
                }
            }
        });
    }

    /// Records a confirmed status change.
    pub fn apply_status_change(
        &mut self,
        chat_id: ChatId,
        status: ChatStatus,
        atendente_id: Option<String>,
    ) {
        self.update_both(chat_id, |chat| {
            chat.status = status;
            chat.atendente_id = atendente_id.clone();
        });
    }

    /// Inserts a created chat at the top, or replaces an existing one in place.
    pub fn apply_create_or_find(&mut self, chat: Chat) {
        if let Some(selected) = self.selected_mut(chat.id) {
            *selected = chat.clone();
        }
        match self.entry_mut(chat.id) {
            Some(entry) => *entry = chat,
            None => self.chats.insert(0, chat),
        }
        self.bump();
    }

    /// Deletes a chat; clears the selection if it pointed at it.
    pub fn remove_chat(&mut self, chat_id: ChatId) -> bool {
        let before = self.chats.len();
        self.chats.retain(|c| c.id != chat_id);
        let removed = self.chats.len() != before;
        self.previews.retain(|_, prior| prior.chat_id != chat_id);
        if self.selected_id() == Some(chat_id) {
            self.selected = None;
        }
        self.bump();
        removed
    }

    /// Selects a chat from the held list data. Returns false for unknown ids.
    pub fn select(&mut self, chat_id: ChatId) -> bool {
        match self.chat(chat_id).cloned() {
            Some(chat) => {
                self.selected = Some(chat);
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.bump();
    }

    /// Finds the phone of a chat from either copy.
    pub fn phone_of(&self, chat_id: ChatId) -> Option<&str> {
        self.chat(chat_id)
            .or_else(|| self.selected.as_ref().filter(|c| c.id == chat_id))
            .map(|c| c.phone.as_str())
    }

    fn entry_mut(&mut self, chat_id: ChatId) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| c.id == chat_id)
    }

    fn selected_mut(&mut self, chat_id: ChatId) -> Option<&mut Chat> {
        self.selected.as_mut().filter(|c| c.id == chat_id)
    }

    fn update_both<F>(&mut self, chat_id: ChatId, mut update: F)
    where
        F: FnMut(&mut Chat),
    {
        if let Some(entry) = self.entry_mut(chat_id) {
            update(entry);
        }
        if let Some(selected) = self.selected_mut(chat_id) {
            update(selected);
        }
        self.bump();
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(chat_id: ChatId, id: i64, message_id: &str, text: &str, secs: i64) -> Message {
        Message {
            id,
            message_id: message_id.into(),
            chat_id,
            from_me: false,
            text: text.into(),
            timestamp: at(secs),
            created_at: at(secs),
        }
    }

    fn chat(id: ChatId, last: i64, messages: Vec<Message>) -> Chat {
        let mut chat = Chat::new(id, format!("55{id}@c.us"), format!("chat {id}"), format!("55{id}"));
        chat.last_message_time = Some(at(last));
        chat.messages = messages;
        chat
    }

    fn ids(store: &ChatStore) -> Vec<ChatId> {
        store.chats().iter().map(|c| c.id).collect()
    }

    #[test]
    fn list_fetch_sorts_and_keeps_selection() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 10, vec![]), chat(2, 30, vec![])]);
        assert!(store.select(1));

        store.apply_list_fetch(vec![chat(1, 10, vec![]), chat(2, 30, vec![]), chat(3, 20, vec![])]);
        assert_eq!(ids(&store), vec![2, 3, 1]);
        assert_eq!(store.selected_id(), Some(1));
    }

    #[test]
    fn chat_fetch_merges_into_list_and_selected() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 0, vec![msg(1, 1, "a", "hi", 0)])]);
        store.select(1);

        store.apply_chat_fetch(chat(1, 5, vec![msg(1, 2, "b", "there", 5)]));

        for held in [store.chat(1).unwrap(), store.selected().unwrap()] {
            assert_eq!(held.messages.len(), 2);
            assert_eq!(held.last_message, "there");
            assert_eq!(held.last_message_time, Some(at(5)));
        }
    }

    #[test]
    fn chat_fetch_for_other_chat_leaves_selection() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 0, vec![]), chat(2, 0, vec![msg(2, 9, "z", "b", 0)])]);
        store.select(2);

        store.apply_chat_fetch(chat(1, 5, vec![msg(1, 1, "a", "for one", 5)]));

        let selected = store.selected().unwrap();
        assert_eq!(selected.id, 2);
        assert_eq!(selected.messages.len(), 1);
        assert_eq!(selected.messages[0].text, "b");
        assert_eq!(store.chat(1).unwrap().last_message, "for one");
    }

    #[test]
    fn chat_fetch_does_not_resort_list() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 30, vec![]), chat(2, 10, vec![])]);
        store.apply_chat_fetch(chat(2, 99, vec![msg(2, 1, "n", "newest", 99)]));
        assert_eq!(ids(&store), vec![1, 2]);
    }

    #[test]
    fn stale_fetch_does_not_regress_last_message() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 0, vec![])]);
        store.apply_chat_fetch(chat(1, 20, vec![msg(1, 1, "a", "old", 10), msg(1, 2, "b", "new", 20)]));

        let mut stale = chat(1, 10, vec![msg(1, 1, "a", "old", 10)]);
        stale.last_message = "old".into();
        store.apply_chat_fetch(stale);

        assert_eq!(store.chat(1).unwrap().last_message, "new");
        assert_eq!(store.chat(1).unwrap().messages.len(), 2);
    }

    #[test]
    fn optimistic_send_then_reconcile() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(7, 0, vec![msg(7, 1, "a", "oi", 0)])]);
        store.select(7);

        store.apply_optimistic_send(7, msg(7, -100, "557_100", "Olá", 10));
        for held in [store.chat(7).unwrap(), store.selected().unwrap()] {
            assert_eq!(held.messages.len(), 2);
            assert!(held.messages[1].is_pending());
            assert_eq!(held.last_message, "Olá");
        }

        let server = chat(7, 10, vec![msg(7, 1, "a", "oi", 0), msg(7, 55, "557_100", "Olá", 10)]);
        store.reconcile_send(7, &server);
        for held in [store.chat(7).unwrap(), store.selected().unwrap()] {
            assert_eq!(held.messages.len(), 2);
            assert_eq!(held.message("557_100").unwrap().id, 55);
        }
    }

    #[test]
    fn rollback_restores_message_count() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(7, 0, vec![msg(7, 1, "a", "oi", 0)])]);
        store.select(7);

        store.apply_optimistic_send(7, msg(7, -100, "557_100", "Olá", 10));
        store.rollback_send(7, "557_100");

        for held in [store.chat(7).unwrap(), store.selected().unwrap()] {
            assert_eq!(held.messages.len(), 1);
            assert!(held.message("557_100").is_none());
            assert_eq!(held.last_message, "oi");
        }
    }

    #[test]
    fn rollback_restores_summary_of_messageless_entry() {
        let mut store = ChatStore::new();
        let mut entry = chat(7, 5, vec![]);
        entry.last_message = "previous summary".into();
        store.apply_list_fetch(vec![entry]);
        store.select(7);

        store.apply_optimistic_send(7, msg(7, -1, "557_1", "never sent", 10));
        assert_eq!(store.chat(7).unwrap().last_message, "never sent");

        store.rollback_send(7, "557_1");
        for held in [store.chat(7).unwrap(), store.selected().unwrap()] {
            assert!(held.messages.is_empty());
            assert_eq!(held.last_message, "previous summary");
            assert_eq!(held.last_message_time, Some(at(5)));
        }
    }

    #[test]
    fn rollback_keeps_newer_fetched_message() {
        let mut store = ChatStore::new();
        let mut entry = chat(7, 5, vec![]);
        entry.last_message = "previous summary".into();
        store.apply_list_fetch(vec![entry]);

        store.apply_optimistic_send(7, msg(7, -1, "557_1", "never sent", 10));
        store.apply_chat_fetch(chat(7, 12, vec![msg(7, 40, "in_40", "customer reply", 12)]));
        store.rollback_send(7, "557_1");

        let held = store.chat(7).unwrap();
        assert_eq!(held.messages.len(), 1);
        assert_eq!(held.last_message, "customer reply");
        assert_eq!(held.last_message_time, Some(at(12)));
    }

    #[test]
    fn send_outcome_for_unselected_chat_leaves_selection() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 0, vec![]), chat(2, 0, vec![msg(2, 9, "z", "b", 0)])]);
        store.select(1);
        store.apply_optimistic_send(1, msg(1, -1, "551_1", "first", 10));
        store.apply_optimistic_send(1, msg(1, -2, "551_2", "second", 11));
        store.select(2);

        let server = chat(1, 10, vec![msg(1, 50, "551_1", "first", 10)]);
        store.reconcile_send(1, &server);
        store.rollback_send(1, "551_2");

        let selected = store.selected().unwrap();
        assert_eq!(selected.id, 2);
        assert_eq!(selected.messages.len(), 1);
        assert_eq!(selected.last_message, "");

        let entry = store.chat(1).unwrap();
        assert_eq!(entry.messages.len(), 1);
        assert_eq!(entry.messages[0].id, 50);
        assert_eq!(entry.last_message, "first");
    }

    #[test]
    fn status_change_respects_identity_guard() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 0, vec![]), chat(2, 0, vec![])]);
        store.select(2);

        store.apply_status_change(1, ChatStatus::EmAtendimento, Some("agent".into()));
        assert_eq!(store.chat(1).unwrap().status, ChatStatus::EmAtendimento);
        assert_eq!(store.selected().unwrap().status, ChatStatus::Standby);

        store.apply_status_change(2, ChatStatus::Resolvido, None);
        assert_eq!(store.selected().unwrap().status, ChatStatus::Resolvido);
        assert_eq!(store.chat(2).unwrap().status, ChatStatus::Resolvido);
    }

    #[test]
    fn create_or_find_prepends_or_replaces() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 50, vec![]), chat(2, 40, vec![])]);

        store.apply_create_or_find(chat(3, 0, vec![]));
        assert_eq!(ids(&store), vec![3, 1, 2]);

        let mut renamed = chat(2, 40, vec![]);
        renamed.name = "renamed".into();
        store.apply_create_or_find(renamed);
        assert_eq!(ids(&store), vec![3, 1, 2]);
        assert_eq!(store.chat(2).unwrap().name, "renamed");
    }

    #[test]
    fn remove_clears_matching_selection() {
        let mut store = ChatStore::new();
        store.apply_list_fetch(vec![chat(1, 0, vec![]), chat(2, 0, vec![])]);
        store.select(1);

        assert!(store.remove_chat(2));
        assert_eq!(store.selected_id(), Some(1));
        assert!(store.remove_chat(1));
        assert!(store.selected().is_none());
        assert!(!store.remove_chat(1));
    }

    #[test]
    fn select_unknown_chat_is_rejected() {
        let mut store = ChatStore::new();
        let before = store.revision();
        assert!(!store.select(99));
        assert_eq!(store.revision(), before);
    }
}
