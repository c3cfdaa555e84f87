//! # Chatsync Protocol
//!
//! Data model and REST wire types for the helpdesk chat API.
//!
//! This crate provides:
//! - `Chat`, `Message` and `ChatStatus` records
//! - Request/response bodies and the `ApiEnvelope` wrapper
//! - Phone normalization and formatting
//! - Chat list queries (filter, search, sort, stats)
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;
mod model;
pub mod phone;
pub mod query;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    decode_envelope, ApiEnvelope, CreateChatRequest, EnvelopeError, SendMessageRequest,
    SendMessageResponse, StatusUpdateRequest,
};
pub use model::{Chat, ChatId, ChatStatus, Message, SYSTEM_MESSAGE_PREFIX};
pub use query::{ChatStats, SortBy};
