//! `show` command.

use super::{CliError, CliResult, OutputFormat};
use crate::display::{chat_header, message_line};
use chatsync_engine::{ChatTransport, FetchOutcome, SyncController};
use chatsync_protocol::ChatId;

/// Fetches one chat and prints its transcript.
pub async fn run<T: ChatTransport + 'static>(
    controller: &SyncController<T>,
    chat_id: ChatId,
    limit: Option<usize>,
    format: OutputFormat,
) -> CliResult<()> {
    if !controller.refresh_list().await {
        return Err(CliError::Failed("list"));
    }
    if controller.chat(chat_id).is_none() {
        return Err(CliError::NotFound(chat_id));
    }
    if controller.refresh_chat(chat_id).await != FetchOutcome::Applied {
        return Err(CliError::Failed("fetch"));
    }
    let chat = controller.chat(chat_id).ok_or(CliError::NotFound(chat_id))?;

    let skip = limit.map_or(0, |n| chat.messages.len().saturating_sub(n));
    match format {
        OutputFormat::Json => {
            let mut chat = chat;
            chat.messages = chat.messages.split_off(skip);
            println!("{}", serde_json::to_string_pretty(&chat)?);
        }
        OutputFormat::Text => {
            println!("{}", chat_header(&chat));
            println!();
            for message in &chat.messages[skip..] {
                println!("{}", message_line(message));
            }
        }
    }
    Ok(())
}
