//! `watch` command.

use super::{CliError, CliResult};
use crate::display::{chat_header, message_line};
use chatsync_engine::{ChatTransport, MessageKey, SyncController};
use chatsync_protocol::ChatId;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

const REDRAW_EVERY: Duration = Duration::from_millis(500);

/// Selects a chat and prints new messages until Ctrl-C.
pub async fn run<T: ChatTransport + 'static>(
    controller: &SyncController<T>,
    chat_id: ChatId,
) -> CliResult<()> {
    if !controller.refresh_list().await {
        return Err(CliError::Failed("list"));
    }
    if !controller.select(chat_id) {
        return Err(CliError::NotFound(chat_id));
    }
    if let Some(chat) = controller.selected() {
        println!("{}", chat_header(&chat));
        println!();
    }

    let mut printed = HashSet::new();
    let mut revision = None;
    let mut redraw = tokio::time::interval(REDRAW_EVERY);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                break;
            }
            _ = redraw.tick() => {
                let current = controller.revision();
                if revision == Some(current) {
                    continue;
                }
                revision = Some(current);
                let Some(chat) = controller.selected() else {
                    debug!(chat_id, "chat left the store");
                    break;
                };
                for message in chat.messages.iter().filter(|m| !m.is_pending()) {
                    if printed.insert(MessageKey::of(message)) {
                        println!("{}", message_line(message));
                    }
                }
            }
        }
    }

    controller.shutdown();
    Ok(())
}
