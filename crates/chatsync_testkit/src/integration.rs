//! Controller test harness.
//!
//! Wires a [`SyncController`] to a [`FakeHelpdesk`] and a
//! [`RecordingNotifier`] with a signed-in session.

use crate::notifier::RecordingNotifier;
use crate::server::FakeHelpdesk;
use chatsync_engine::{MemorySession, SyncConfig, SyncContext, SyncController};
use chatsync_protocol::Chat;
use std::sync::Arc;
use std::time::Duration;

/// Token held by the harness session.
pub const TEST_TOKEN: &str = "test-token";
/// Agent id held by the harness session.
pub const TEST_AGENT: &str = "agent-1";

/// A controller talking to an in-memory server.
pub struct ControllerHarness {
    /// The controller under test.
    pub controller: SyncController<Arc<FakeHelpdesk>>,
    /// The server behind it.
    pub server: Arc<FakeHelpdesk>,
    /// Notifications emitted by the controller.
    pub notifier: Arc<RecordingNotifier>,
    /// The session passed to the controller.
    pub session: Arc<MemorySession>,
}

impl ControllerHarness {
    /// Creates a harness with no fetch cool-down.
    pub fn new(chats: Vec<Chat>) -> Self {
        Self::with_config(chats, test_config())
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(chats: Vec<Chat>, config: SyncConfig) -> Self {
        let server = Arc::new(FakeHelpdesk::with_chats(chats));
        let notifier = Arc::new(RecordingNotifier::new());
        let session = Arc::new(MemorySession::new(
            Some(TEST_TOKEN.to_string()),
            Some(TEST_AGENT.to_string()),
        ));
        let context = SyncContext::new(session.clone()).with_notifier(notifier.clone());
        let controller = SyncController::new(config, server.clone(), context);
        Self {
            controller,
            server,
            notifier,
            session,
        }
    }

    /// Creates a harness and loads the chat list.
    pub async fn loaded(chats: Vec<Chat>) -> Self {
        let harness = Self::new(chats);
        assert!(harness.controller.refresh_list().await, "initial list fetch failed");
        harness
    }

    /// Lets spawned tasks run for `duration` of (paused) time.
    pub async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Configuration used by [`ControllerHarness::new`].
pub fn test_config() -> SyncConfig {
    SyncConfig::new("http://helpdesk.test").with_fetch_cooldown(Duration::ZERO)
}
