//! `status`, `open` and `close` commands.

use super::{CliError, CliResult};
use chatsync_engine::{ChatTransport, SyncController};
use chatsync_protocol::phone::{format_phone, is_valid_brazilian_phone};
use chatsync_protocol::{ChatId, ChatStatus};
use tracing::warn;

/// Changes the status of a chat, assigning it to `agent` or the signed-in user.
pub async fn status<T: ChatTransport + 'static>(
    controller: &SyncController<T>,
    chat_id: ChatId,
    status: ChatStatus,
    agent: Option<String>,
) -> CliResult<()> {
    let agent = agent.or_else(|| controller.session().user());
    if !controller.update_status(chat_id, status, agent).await {
        return Err(CliError::Failed("status"));
    }
    println!("Chat {chat_id}: {}", status.display_name());
    Ok(())
}

/// Creates or finds the chat for `phone`.
pub async fn open<T: ChatTransport + 'static>(
    controller: &SyncController<T>,
    phone: &str,
    name: &str,
    waha_id: Option<&str>,
) -> CliResult<()> {
    if !is_valid_brazilian_phone(phone) {
        warn!(phone, "phone is not a Brazilian number with area code");
    }
    let chat = controller
        .create_from_contact(phone, name, waha_id)
        .await
        .ok_or(CliError::Failed("open"))?;
    println!(
        "Chat {} - {} {}",
        chat.id,
        chat.name,
        format_phone(&chat.phone)
    );
    Ok(())
}

/// Deactivates a chat.
pub async fn close<T: ChatTransport + 'static>(
    controller: &SyncController<T>,
    chat_id: ChatId,
) -> CliResult<()> {
    if !controller.deactivate(chat_id).await {
        return Err(CliError::Failed("close"));
    }
    Ok(())
}
