//! Discord client using serenity.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{ChannelId, Context, EventHandler, GatewayIntents, Http, Message, Ready};
use serenity::Client;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::chatbot::engine::Router;
use crate::chatbot::message::ChatMessage;

/// Discord's hard limit on message content length, in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("invalid channel id '{0}'")]
    InvalidChannel(String),
    #[error("failed to send: {0}")]
    Send(#[source] serenity::Error),
    #[error("client error: {0}")]
    Client(#[source] serenity::Error),
}

/// Reply capability scoped to a channel.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), DiscordError>;
}

/// Sends through Discord's REST API.
pub struct DiscordSender {
    http: Arc<Http>,
}

impl DiscordSender {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatSender for DiscordSender {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), DiscordError> {
        let id = match channel_id.parse::<u64>() {
            Ok(id) if id != 0 => ChannelId::new(id),
            _ => return Err(DiscordError::InvalidChannel(channel_id.to_string())),
        };

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            id.say(&self.http, chunk).await.map_err(DiscordError::Send)?;
        }
        Ok(())
    }
}

/// Split text into pieces of at most `max_chars` characters, preferring to
/// break after a newline.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        // Byte offset of the first char past the limit
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = match rest[..limit].rfind('\n') {
            Some(nl) if nl > 0 => nl + 1,
            _ => limit,
        };
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

fn discord_to_chat_message(msg: &Message) -> ChatMessage {
    ChatMessage {
        author_is_bot: msg.author.bot,
        guild_id: msg.guild_id.map(|id| id.get().to_string()),
        channel_id: msg.channel_id.get().to_string(),
        content: msg.content.clone(),
    }
}

/// Gateway event handler; forwards every message to the router.
pub struct Handler {
    router: Arc<Router>,
}

impl Handler {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// Gateway intents needed to read guild message content.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("✅ Logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let chat_msg = discord_to_chat_message(&msg);
        let sender = DiscordSender::new(ctx.http.clone());
        self.router.handle_message(&sender, &chat_msg).await;
    }
}

/// Connect to the gateway and block until the client shuts down.
#[instrument(skip(token, router), fields(token_len = token.len()))]
pub async fn run(token: &str, router: Arc<Router>) -> Result<(), DiscordError> {
    let mut client = Client::builder(token, Handler::intents())
        .event_handler(Handler::new(router))
        .await
        .map_err(DiscordError::Client)?;

    info!("Connecting to Discord gateway");
    client.start().await.map_err(|e| {
        warn!("Discord client stopped: {e}");
        DiscordError::Client(e)
    })
}
