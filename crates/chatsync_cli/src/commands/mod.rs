//! CLI command implementations.

pub mod list;
pub mod manage;
pub mod send;
pub mod show;
pub mod watch;

use chatsync_engine::SyncError;
use chatsync_protocol::{ChatId, ChatStatus, SortBy};
use clap::ValueEnum;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The chat is not in the list returned by the server.
    #[error("chat {0} not found")]
    NotFound(ChatId),

    /// The operation failed; the reason was already reported.
    #[error("{0} failed")]
    Failed(&'static str),

    /// Output could not be encoded.
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Engine error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Waiting for Ctrl-C failed.
    #[error("signal error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for commands.
pub type CliResult<T> = Result<T, CliError>;

/// Output format for read commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Chat list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Most recent message first.
    Recent,
    /// Customer name.
    Name,
    /// Workflow status.
    Status,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Recent => SortBy::Recent,
            SortArg::Name => SortBy::Name,
            SortArg::Status => SortBy::Status,
        }
    }
}

/// Parses a status by wire name or display name.
pub fn parse_status(raw: &str) -> Result<ChatStatus, String> {
    let wanted = raw.trim().to_lowercase();
    ChatStatus::ALL
        .into_iter()
        .find(|s| s.as_str() == wanted || s.display_name().to_lowercase() == wanted)
        .ok_or_else(|| {
            let names: Vec<_> = ChatStatus::ALL.iter().map(|s| s.as_str()).collect();
            format!("unknown status {raw:?}, expected one of {}", names.join(", "))
        })
}
