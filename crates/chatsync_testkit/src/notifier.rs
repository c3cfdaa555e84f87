//! Notifier that keeps every notification for assertions.

use chatsync_engine::{Notification, Notifier};
use parking_lot::Mutex;

/// Records notifications in delivery order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    /// Messages of error notifications.
    pub fn errors(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.is_error())
            .map(|n| n.message.clone())
            .collect()
    }

    /// Messages of success notifications.
    pub fn successes(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| !n.is_error())
            .map(|n| n.message.clone())
            .collect()
    }

    /// The most recent notification.
    pub fn last(&self) -> Option<Notification> {
        self.notifications.lock().last().cloned()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.notifications.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}
