//! # Chatsync Engine
//!
//! Client-side chat state synchronizer for the helpdesk.
//!
//! This crate provides:
//! - Message merge engine (dedup by `message_id`, ordering by timestamp)
//! - Chat store holding the list and the selected conversation
//! - Sync controller (fetch, optimistic send, status, create, deactivate)
//! - Polling of the selected chat with an in-flight fetch guard
//! - HTTP transport abstraction with a `reqwest` client
//!
//! ## Architecture
//!
//! The server is the source of truth; the store is a cache kept consistent
//! with it by the controller:
//! 1. Caller actions go through [`SyncController`]
//! 2. The controller calls the [`ChatTransport`]
//! 3. Responses are merged into the [`ChatStore`]
//!
//! ## Key Invariants
//!
//! - No two held messages share a merge key
//! - Held messages are ascending by timestamp
//! - A response for a chat the user navigated away from never replaces the
//!   selected chat
//! - At most one outstanding fetch per chat id

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
mod error;
mod http;
mod in_flight;
mod merge;
mod notify;
mod poller;
mod session;
mod store;
mod transport;

pub use config::{
    SyncConfig, ENV_API_URL, ENV_COOLDOWN_SECS, ENV_POLL_SECS, ENV_TIMEOUT_SECS,
};
pub use controller::{FetchOutcome, SyncActivity, SyncContext, SyncController, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, HttpTransport, ReqwestClient};
pub use in_flight::InFlightSet;
pub use merge::{merge, merge_into, remove_by_message_id, MessageKey};
pub use notify::{Notification, NotificationKind, Notifier, TracingNotifier};
pub use poller::PollTask;
pub use session::{MemorySession, SessionProvider};
pub use store::ChatStore;
pub use transport::{ChatTransport, Endpoint, Method, MockTransport};
