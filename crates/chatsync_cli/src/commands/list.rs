//! `list` command.

use super::{CliError, CliResult, OutputFormat, SortArg};
use crate::display::chat_line;
use chatsync_engine::{ChatTransport, SyncController};
use chatsync_protocol::query::{filter_by_status, search, sort_chats};
use chatsync_protocol::{Chat, ChatStatus};
use chrono::Utc;

/// Fetches the chat list and prints the matching chats.
pub async fn run<T: ChatTransport + 'static>(
    controller: &SyncController<T>,
    status: Option<ChatStatus>,
    term: Option<&str>,
    sort: SortArg,
    format: OutputFormat,
) -> CliResult<()> {
    if !controller.refresh_list().await {
        return Err(CliError::Failed("list"));
    }

    let chats = select(&controller.chats(), status, term, sort);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chats)?),
        OutputFormat::Text => {
            if chats.is_empty() {
                println!("Nenhum chat encontrado");
            }
            let now = Utc::now();
            for chat in &chats {
                println!("{}", chat_line(chat, now));
            }
        }
    }
    Ok(())
}

/// Applies filter, search and ordering to a chat list.
fn select(
    chats: &[Chat],
    status: Option<ChatStatus>,
    term: Option<&str>,
    sort: SortArg,
) -> Vec<Chat> {
    let filtered: Vec<Chat> = match status {
        Some(status) => filter_by_status(chats, status).into_iter().cloned().collect(),
        None => chats.to_vec(),
    };
    let found: Vec<Chat> = match term {
        Some(term) => search(&filtered, term).into_iter().cloned().collect(),
        None => filtered,
    };
    sort_chats(&found, sort.into())
}
