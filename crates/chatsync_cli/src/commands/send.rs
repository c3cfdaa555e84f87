//! `send` command.

use super::{CliError, CliResult};
use chatsync_engine::{ChatTransport, SyncController};
use chatsync_protocol::ChatId;

/// Sends `text` to a chat.
pub async fn run<T: ChatTransport + 'static>(
    controller: &SyncController<T>,
    chat_id: ChatId,
    text: &str,
    from_me: bool,
) -> CliResult<()> {
    if text.trim().is_empty() {
        println!("Nada para enviar");
        return Ok(());
    }
    if !controller.refresh_list().await {
        return Err(CliError::Failed("list"));
    }
    if !controller.send(chat_id, text, from_me).await {
        return Err(CliError::Failed("send"));
    }

    if let Some(chat) = controller.chat(chat_id) {
        println!("Mensagem enviada para {} ({})", chat.name, chat.messages.len());
    }
    Ok(())
}
