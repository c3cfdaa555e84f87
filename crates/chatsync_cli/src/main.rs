//! Chatsync CLI
//!
//! Command-line client for the helpdesk chat API.
//!
//! # Commands
//!
//! - `list` - List chats with filters and ordering
//! - `show` - Print one chat with its messages
//! - `send` - Send a message to a chat
//! - `status` - Change the status of a chat
//! - `open` - Create or find the chat for a phone
//! - `close` - Deactivate a chat
//! - `watch` - Follow a chat, printing new messages as they arrive

mod commands;
mod display;

use chatsync_engine::{
    HttpTransport, MemorySession, SessionProvider, SyncConfig, SyncContext, SyncController,
    ENV_API_URL,
};
use chatsync_protocol::ChatStatus;
use clap::{Parser, Subcommand};
use commands::{OutputFormat, SortArg};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Helpdesk chat command-line client.
#[derive(Parser)]
#[command(name = "chatsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the helpdesk API
    #[arg(global = true, long, env = ENV_API_URL)]
    url: Option<String>,

    /// Bearer token of the signed-in agent
    #[arg(global = true, long, env = "CHATSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Id of the signed-in agent
    #[arg(global = true, long, env = "CHATSYNC_USER")]
    user: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List chats
    List {
        /// Only chats with this status
        #[arg(short, long, value_parser = commands::parse_status)]
        status: Option<ChatStatus>,

        /// Search name, phone and last message
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Ordering
        #[arg(long, value_enum, default_value = "recent")]
        sort: SortArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a chat and its messages
    Show {
        /// Chat id
        id: i64,

        /// Only the last N messages
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Send a message
    Send {
        /// Chat id
        id: i64,

        /// Message text
        text: String,

        /// Record the message as sent by the customer
        #[arg(long)]
        customer: bool,
    },

    /// Change the status of a chat
    Status {
        /// Chat id
        id: i64,

        /// New status (standby, em_atendimento, resolvido, encerrado)
        #[arg(value_parser = commands::parse_status)]
        status: ChatStatus,

        /// Agent taking the chat (defaults to --user)
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// Create or find the chat for a phone
    Open {
        /// Customer phone, any formatting
        phone: String,

        /// Customer name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Channel id (defaults to <digits>@c.us)
        #[arg(long)]
        waha_id: Option<String>,
    },

    /// Deactivate a chat
    Close {
        /// Chat id
        id: i64,
    },

    /// Follow a chat until interrupted
    Watch {
        /// Chat id
        id: i64,

        /// Poll interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("Chatsync CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = SyncConfig::from_env()?;
    if let Some(url) = &cli.url {
        config = config.with_base_url(url);
    }
    if let Commands::Watch {
        interval: Some(secs),
        ..
    } = &cli.command
    {
        config = config.with_poll_interval(Duration::from_secs(*secs));
    }
    config.validate()?;

    let session = Arc::new(MemorySession::new(cli.token, cli.user));
    if session.token().is_none() {
        return Err("no token: pass --token or set CHATSYNC_TOKEN".into());
    }

    let transport = HttpTransport::with_reqwest(config.clone(), session.clone())?;
    let controller = SyncController::new(config, transport, SyncContext::new(session));

    match cli.command {
        Commands::List {
            status,
            search,
            sort,
            format,
        } => {
            commands::list::run(&controller, status, search.as_deref(), sort, format).await?;
        }
        Commands::Show { id, limit, format } => {
            commands::show::run(&controller, id, limit, format).await?;
        }
        Commands::Send { id, text, customer } => {
            commands::send::run(&controller, id, &text, !customer).await?;
        }
        Commands::Status { id, status, agent } => {
            commands::manage::status(&controller, id, status, agent).await?;
        }
        Commands::Open {
            phone,
            name,
            waha_id,
        } => {
            commands::manage::open(&controller, &phone, &name, waha_id.as_deref()).await?;
        }
        Commands::Close { id } => {
            commands::manage::close(&controller, id).await?;
        }
        Commands::Watch { id, .. } => {
            commands::watch::run(&controller, id).await?;
        }
        Commands::Version => {}
    }

    Ok(())
}
