//! Serenity event handler: the Discord side of the bot.

use alfred_assistant::persona::{help_text, intro};
use alfred_assistant::{Dispatcher, Reply, StatusSink};
use alfred_core::UserId;
use async_trait::async_trait;
use serenity::all::{
    ChannelId, Context, CreateAttachment, CreateMessage, EventHandler, Http, Message, Ready,
    ShardManager, UserId as DiscordUserId,
};
use serenity::prelude::TypeMapKey;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Discord rejects messages longer than this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Client data key for the shard manager, used to report gateway latency.
pub struct ShardManagerKey;

impl TypeMapKey for ShardManagerKey {
    type Value = Arc<ShardManager>;
}

/// Text commands answered without routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Ping,
    Features,
}

impl Command {
    /// Recognises `<prefix>help`, `<prefix>ping` and `<prefix>features`.
    /// Anything else is an ordinary message.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix(prefix)?;
        match rest.split_whitespace().next()?.to_ascii_lowercase().as_str() {
            "help" => Some(Self::Help),
            "ping" => Some(Self::Ping),
            "features" => Some(Self::Features),
            _ => None,
        }
    }

    /// True for any prefixed text, known command or not. Unknown commands
    /// are dropped rather than routed.
    #[must_use]
    pub fn is_prefixed(text: &str, prefix: &str) -> bool {
        !prefix.is_empty() && text.trim_start().starts_with(prefix)
    }
}

/// Removes `<@id>` and `<@!id>` mentions of the bot.
#[must_use]
pub fn strip_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{bot_id}>"), "")
        .replace(&format!("<@!{bot_id}>"), "")
        .trim()
        .to_string()
}

/// Splits text into chunks Discord accepts, preferring line breaks.
#[must_use]
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        // A single line longer than the limit is cut on character boundaries.
        let mut chars = line.chars().peekable();
        while chars.peek().is_some() {
            let piece: String = chars.by_ref().take(limit).collect();
            let piece_len = piece.chars().count();
            if piece_len == limit {
                chunks.push(piece);
            } else {
                current = piece;
                current_len = piece_len;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Posts handler progress messages to the originating channel.
struct ChannelStatus {
    http: Arc<Http>,
    channel: ChannelId,
}

#[async_trait]
impl StatusSink for ChannelStatus {
    async fn post(&self, text: &str) {
        if let Err(e) = self.channel.say(&self.http, text).await {
            warn!(error = %e, "failed to post status message");
        }
    }
}

/// The bot's event handler.
pub struct Bot {
    dispatcher: Arc<Dispatcher>,
    command_prefix: String,
    owner_id: Option<u64>,
}

impl Bot {
    /// Creates the handler.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, command_prefix: String, owner_id: Option<u64>) -> Self {
        Self {
            dispatcher,
            command_prefix,
            owner_id,
        }
    }

    async fn run_command(&self, ctx: &Context, msg: &Message, command: Command) {
        let text = match command {
            Command::Help => help_text(&self.command_prefix),
            Command::Ping => match gateway_latency(ctx).await {
                Some(ms) => format!("Pong! 🏓 Latency: {ms}ms"),
                None => "Pong! 🏓".to_string(),
            },
            Command::Features => format!(
                "**Available Features:**\n{}",
                self.dispatcher.router().summary()
            ),
        };
        debug!(?command, "answering command");
        send_text(ctx, msg, &text).await;
    }
}

async fn gateway_latency(ctx: &Context) -> Option<u128> {
    let manager = {
        let data = ctx.data.read().await;
        data.get::<ShardManagerKey>()?.clone()
    };
    let runners = manager.runners.lock().await;
    runners
        .get(&ctx.shard_id)
        .and_then(|runner| runner.latency)
        .map(|latency| latency.as_millis())
}

/// Sends `text` as a reply to `msg`, split to fit Discord's limit.
async fn send_text(ctx: &Context, msg: &Message, text: &str) {
    for (i, chunk) in split_message(text, MESSAGE_LIMIT).into_iter().enumerate() {
        let mut builder = CreateMessage::new().content(chunk);
        if i == 0 {
            builder = builder.reference_message(msg);
        }
        if let Err(e) = msg.channel_id.send_message(&ctx.http, builder).await {
            error!(error = %e, "failed to send reply");
            return;
        }
    }
}

/// Sends the reply text, then each attachment in its own message.
async fn deliver(ctx: &Context, msg: &Message, reply: Reply) {
    if !reply.text.trim().is_empty() {
        send_text(ctx, msg, &reply.text).await;
    }

    for attachment in reply.attachments {
        match CreateAttachment::path(&attachment.path).await {
            Ok(mut file) => {
                file.filename.clone_from(&attachment.filename);
                let builder = CreateMessage::new().add_file(file);
                if let Err(e) = msg.channel_id.send_message(&ctx.http, builder).await {
                    warn!(file = %attachment.filename, error = %e, "failed to upload file");
                    send_text(ctx, msg, &format!("Failed to send file: {}", attachment.filename))
                        .await;
                }
            }
            Err(e) => {
                warn!(path = %attachment.path.display(), error = %e, "failed to read attachment");
                send_text(ctx, msg, &format!("Failed to send file: {}", attachment.filename))
                    .await;
            }
        }

        if attachment.ephemeral
            && let Err(e) = tokio::fs::remove_file(&attachment.path).await
        {
            debug!(path = %attachment.path.display(), error = %e, "could not remove sent file");
        }
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected to Discord");

        let Some(owner) = self.owner_id else {
            return;
        };
        let result = async {
            let channel = DiscordUserId::new(owner).create_dm_channel(&ctx).await?;
            channel.id.say(&ctx.http, "✅ Ready to go!").await
        }
        .await;
        match result {
            Ok(_) => info!(owner, "sent start-up message"),
            Err(e) => warn!(owner, error = %e, "could not send start-up message"),
        }
    }

    #[instrument(skip_all, fields(author = %msg.author.id, channel = %msg.channel_id))]
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Some(command) = Command::parse(&msg.content, &self.command_prefix) {
            self.run_command(&ctx, &msg, command).await;
            return;
        }

        let bot_id = ctx.cache.current_user().id;
        let is_dm = msg.guild_id.is_none();
        if !is_dm && !msg.mentions_user_id(bot_id) {
            return;
        }

        let text = strip_mention(&msg.content, bot_id.get());
        if text.is_empty() {
            if !is_dm {
                send_text(&ctx, &msg, &intro()).await;
            }
            return;
        }
        if Command::is_prefixed(&text, &self.command_prefix) {
            debug!(%text, "ignoring unknown command");
            return;
        }

        let typing = msg.channel_id.start_typing(&ctx.http);
        let status = ChannelStatus {
            http: Arc::clone(&ctx.http),
            channel: msg.channel_id,
        };
        let reply = self
            .dispatcher
            .dispatch(UserId::new(msg.author.id.get()), &text, &status)
            .await;
        typing.stop();

        deliver(&ctx, &msg, reply).await;
    }
}
