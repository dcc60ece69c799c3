//! Platform-neutral inbound message.

/// A chat message as the router sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Set when the author is an automated account.
    pub author_is_bot: bool,
    /// Guild (server) the message was posted in. `None` for direct messages.
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub content: String,
}

impl ChatMessage {
    /// Content with surrounding whitespace removed, as commands are matched.
    pub fn trimmed(&self) -> &str {
        self.content.trim()
    }

    /// Short preview for log lines.
    pub fn preview(&self) -> String {
        self.trimmed().chars().take(50).collect()
    }
}
