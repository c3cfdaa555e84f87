//! Periodic re-fetch of the selected chat.

use chatsync_protocol::ChatId;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// A running poll loop bound to one chat.
///
/// The tick callback runs once immediately and then once per interval. It
/// returns `false` to stop the loop. Cancelling the task (or dropping it)
/// only stops future ticks; work the callback spawned keeps running.
#[derive(Debug)]
pub struct PollTask {
    chat_id: ChatId,
    interval: watch::Sender<Duration>,
    handle: Option<JoinHandle<()>>,
}

impl PollTask {
    /// Spawns a poll loop on the current tokio runtime.
    pub fn spawn<F>(chat_id: ChatId, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (tx, mut rx) = watch::channel(interval);
        let handle = tokio::spawn(async move {
            let mut period = *rx.borrow_and_update();
            loop {
                if !tick() {
                    debug!(chat_id, "poll loop stopped by callback");
                    return;
                }

                let mut deadline = Instant::now() + period;
                loop {
                    tokio::select! {
                        _ = sleep_until(deadline) => break,
                        changed = rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            period = *rx.borrow_and_update();
                            deadline = Instant::now() + period;
                        }
                    }
                }
            }
        });

        debug!(chat_id, ?interval, "poll loop started");
        Self {
            chat_id,
            interval: tx,
            handle: Some(handle),
        }
    }

    /// Chat this task polls.
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Current interval.
    pub fn interval(&self) -> Duration {
        *self.interval.borrow()
    }

    /// Changes the interval; the next tick is rescheduled from now.
    ///
    /// Returns false for a zero interval or a stopped task.
    pub fn set_interval(&self, interval: Duration) -> bool {
        if interval.is_zero() || !self.is_active() {
            return false;
        }
        self.interval.send_replace(interval);
        true
    }

    /// Returns true while the loop is running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the loop. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(chat_id = self.chat_id, "poll loop cancelled");
        }
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
