//! Message router - turns inbound chat messages into store updates and
//! Gemini replies.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chatbot::database::{ChannelStore, StoreError};
use crate::chatbot::discord::ChatSender;
use crate::chatbot::gemini::TextGenerator;
use crate::chatbot::message::ChatMessage;

pub const ACTIVATE_COMMAND: &str = "/ac";
pub const DEACTIVATE_COMMAND: &str = "/d-ac";
pub const IMAGE_COMMAND: &str = "/img";

/// User-facing reply texts.
pub mod replies {
    pub const ACTIVATED: &str = "✅ このチャンネルをアクティブにしたよ！";
    pub const ALREADY_ACTIVE: &str = "⚠️ すでにアクティブだよ！";
    pub const DEACTIVATED: &str = "🛑 アクティブを解除したよ！";
    pub const NOT_ACTIVE: &str = "⚠️ もともとアクティブじゃないよ！";
    pub const IMAGE_USAGE: &str = "🖼️ `/img 猫が空を飛ぶ` みたいに送ってね！";
    pub const IMAGE_PENDING: &str = "画像生成中...🧠";
    pub const IMAGE_FAILED: &str = "画像生成中にエラー出ちゃったみたい💥";
    pub const THINKING: &str = "考え中...";
    pub const CHAT_FAILED: &str = "エラーが出ちゃったみたい💦";
    pub const STORE_FAILED: &str = "⚠️ データベースでエラーが出ちゃったみたい…";
}

/// What an inbound message asks for. Matching is case-sensitive and runs on
/// trimmed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Activate,
    Deactivate,
    /// Prompt after the image token, trimmed. May be empty.
    Image(&'a str),
    /// Anything else; the full trimmed content.
    Chat(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(content: &'a str) -> Self {
        let content = content.trim();
        if content == ACTIVATE_COMMAND {
            Command::Activate
        } else if content == DEACTIVATE_COMMAND {
            Command::Deactivate
        } else if let Some(rest) = content.strip_prefix(IMAGE_COMMAND) {
            Command::Image(rest.trim())
        } else {
            Command::Chat(content)
        }
    }
}

/// How a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Bot author, no guild, or an inactive channel.
    Ignored,
    Activated,
    AlreadyActive,
    Deactivated,
    NotActive,
    ImageUsage,
    Generated,
    GenerationFailed,
    StoreFailed,
}

/// Routes messages to the channel store and the text generator.
///
/// Holds no per-channel state; everything durable lives in the store.
pub struct Router {
    store: Arc<dyn ChannelStore>,
    generator: Arc<dyn TextGenerator>,
}

impl Router {
    pub fn new(store: Arc<dyn ChannelStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    /// Handle one inbound message, replying through `sender`.
    pub async fn handle_message(&self, sender: &dyn ChatSender, msg: &ChatMessage) -> Outcome {
        if msg.author_is_bot {
            debug!("Ignoring bot message: \"{}\"", msg.preview());
            return Outcome::Ignored;
        }
        let Some(guild_id) = msg.guild_id.as_deref() else {
            debug!("Ignoring message without guild in channel {}", msg.channel_id);
            return Outcome::Ignored;
        };
        let channel_id = msg.channel_id.as_str();

        match Command::parse(msg.trimmed()) {
            Command::Activate => self.activate(sender, guild_id, channel_id).await,
            Command::Deactivate => self.deactivate(sender, guild_id, channel_id).await,
            Command::Image(prompt) => self.image(sender, channel_id, prompt).await,
            Command::Chat(text) => self.chat(sender, guild_id, channel_id, text).await,
        }
    }

    /// Returns `false` when the channel was already active.
    async fn try_activate(&self, guild_id: &str, channel_id: &str) -> Result<bool, StoreError> {
        if self.store.is_active(guild_id, channel_id).await? {
            return Ok(false);
        }
        self.store.activate(guild_id, channel_id).await?;
        Ok(true)
    }

    /// Returns `false` when the channel wasn't active.
    async fn try_deactivate(&self, guild_id: &str, channel_id: &str) -> Result<bool, StoreError> {
        if !self.store.is_active(guild_id, channel_id).await? {
            return Ok(false);
        }
        self.store.deactivate(guild_id, channel_id).await?;
        Ok(true)
    }

    async fn activate(&self, sender: &dyn ChatSender, guild_id: &str, channel_id: &str) -> Outcome {
        match self.try_activate(guild_id, channel_id).await {
            Ok(true) => {
                info!("Channel {}/{} activated", guild_id, channel_id);
                reply(sender, channel_id, replies::ACTIVATED).await;
                Outcome::Activated
            }
            Ok(false) => {
                reply(sender, channel_id, replies::ALREADY_ACTIVE).await;
                Outcome::AlreadyActive
            }
            Err(e) => self.store_failed(sender, channel_id, e).await,
        }
    }

    async fn deactivate(&self, sender: &dyn ChatSender, guild_id: &str, channel_id: &str) -> Outcome {
        match self.try_deactivate(guild_id, channel_id).await {
            Ok(true) => {
                info!("Channel {}/{} deactivated", guild_id, channel_id);
                reply(sender, channel_id, replies::DEACTIVATED).await;
                Outcome::Deactivated
            }
            Ok(false) => {
                reply(sender, channel_id, replies::NOT_ACTIVE).await;
                Outcome::NotActive
            }
            Err(e) => self.store_failed(sender, channel_id, e).await,
        }
    }

    async fn image(&self, sender: &dyn ChatSender, channel_id: &str, prompt: &str) -> Outcome {
        if prompt.is_empty() {
            reply(sender, channel_id, replies::IMAGE_USAGE).await;
            return Outcome::ImageUsage;
        }

        reply(sender, channel_id, replies::IMAGE_PENDING).await;
        self.generate(sender, channel_id, prompt, replies::IMAGE_FAILED).await
    }

    async fn chat(&self, sender: &dyn ChatSender, guild_id: &str, channel_id: &str, text: &str) -> Outcome {
        match self.store.is_active(guild_id, channel_id).await {
            Ok(true) => {}
            Ok(false) => return Outcome::Ignored,
            Err(e) => return self.store_failed(sender, channel_id, e).await,
        }

        info!("📨 {}/{}: \"{}\"", guild_id, channel_id, text.chars().take(50).collect::<String>());
        reply(sender, channel_id, replies::THINKING).await;
        self.generate(sender, channel_id, text, replies::CHAT_FAILED).await
    }

    async fn generate(
        &self,
        sender: &dyn ChatSender,
        channel_id: &str,
        prompt: &str,
        failure_reply: &str,
    ) -> Outcome {
        match self.generator.generate(prompt).await {
            Ok(text) => {
                reply(sender, channel_id, &text).await;
                Outcome::Generated
            }
            Err(e) => {
                warn!("🧨 Generation failed in channel {}: {}", channel_id, e);
                reply(sender, channel_id, failure_reply).await;
                Outcome::GenerationFailed
            }
        }
    }

    async fn store_failed(&self, sender: &dyn ChatSender, channel_id: &str, e: StoreError) -> Outcome {
        error!("Store error in channel {}: {}", channel_id, e);
        reply(sender, channel_id, replies::STORE_FAILED).await;
        Outcome::StoreFailed
    }
}

/// Send a reply; failures are logged and otherwise dropped.
async fn reply(sender: &dyn ChatSender, channel_id: &str, text: &str) {
    if let Err(e) = sender.send_message(channel_id, text).await {
        warn!("Failed to reply in channel {}: {}", channel_id, e);
    }
}
