//! # Chatsync Testkit
//!
//! Test utilities for the chat synchronizer.
//!
//! This crate provides:
//! - Chat and message fixtures
//! - Property-based test generators using proptest
//! - An in-memory helpdesk server implementing the transport
//! - A notifier that records notifications
//! - A controller harness wiring all of the above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatsync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_server() {
//!     let harness = ControllerHarness::loaded(vec![chat_at(1, 10)]).await;
//!     assert!(harness.controller.send(1, "Olá", true).await);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod notifier;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::notifier::*;
    pub use crate::server::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use notifier::*;
pub use server::*;
