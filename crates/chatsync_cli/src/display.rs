//! Text rendering for chats and messages.

use chatsync_protocol::phone::format_phone;
use chatsync_protocol::query::truncate;
use chatsync_protocol::{Chat, ChatStats, Message};
use chrono::{DateTime, Utc};

const PREVIEW_CHARS: usize = 40;

/// Formats `time` relative to `now`, the way the agent inbox shows it.
pub fn relative_time(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - time;
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        "agora".to_string()
    } else if minutes < 60 {
        format!("{minutes}min")
    } else if elapsed.num_hours() < 24 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d", elapsed.num_days())
    } else {
        time.format("%d/%m/%Y").to_string()
    }
}

/// One inbox line for a chat.
pub fn chat_line(chat: &Chat, now: DateTime<Utc>) -> String {
    let when = chat
        .last_message_time
        .map(|t| relative_time(t, now))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>6}  {:<24} {:<18} {:<15} {:>10}  {}",
        chat.id,
        truncate(&chat.name, 24),
        format_phone(&chat.phone),
        chat.status.display_name(),
        when,
        truncate(&chat.last_message, PREVIEW_CHARS),
    )
}

/// One transcript line for a message.
pub fn message_line(message: &Message) -> String {
    let who = if message.is_system() {
        "sistema"
    } else if message.from_me {
        "agente"
    } else {
        "cliente"
    };
    let pending = if message.is_pending() { " (enviando)" } else { "" };
    format!(
        "[{}] {:<7} {}{}",
        message.timestamp.format("%d/%m %H:%M"),
        who,
        message.text,
        pending
    )
}

/// Header block for a chat transcript.
pub fn chat_header(chat: &Chat) -> String {
    let stats = ChatStats::of(chat);
    let mut header = format!(
        "#{} {} - {}\nstatus: {}",
        chat.id,
        chat.name,
        format_phone(&chat.phone),
        chat.status.display_name()
    );
    if let Some(agent) = &chat.atendente_id {
        header.push_str(&format!(" ({agent})"));
    }
    header.push_str(&format!(
        "\nmensagens: {} (cliente {}, agente {}), duração {}min",
        stats.total_messages,
        stats.user_messages,
        stats.agent_messages,
        stats.duration.num_minutes()
    ));
    header
}
