// File: pulsar-common/src/models/discord.rs

use chrono::{DateTime, Utc};

/// File attached to a Discord message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttachment {
    pub filename: String,
    pub content_type: Option<String>,
}

/// Inbound guild message, already stripped of everything the moderation
/// layer does not look at.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub author_is_bot: bool,
    pub role_ids: Vec<String>,
    pub content: String,
    pub attachments: Vec<MessageAttachment>,
    pub timestamp: DateTime<Utc>,
}

impl MessageEvent {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|r| r == role_id)
    }
}

/// A message deletion observed on the gateway. `before_delete` is the last
/// known copy of the message, when the gateway cache still had it.
#[derive(Debug, Clone)]
pub struct MessageDeleteEvent {
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub before_delete: Option<MessageEvent>,
}

/// A message edit. `before` is the cached copy from before the edit, when
/// there was one; `after` is the message as it now reads.
#[derive(Debug, Clone)]
pub struct MessageUpdateEvent {
    pub before: Option<MessageEvent>,
    pub after: MessageEvent,
    pub edited_at: Option<DateTime<Utc>>,
}

/// A member joining a guild.
#[derive(Debug, Clone)]
pub struct MemberJoinEvent {
    pub guild_id: String,
    pub user_id: String,
    pub user_name: String,
    pub avatar_url: Option<String>,
    pub is_bot: bool,
    /// Whether the account has a verified email, when Discord says so.
    pub verified: Option<bool>,
    /// Derived from the user ID snowflake.
    pub account_created_at: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
}

impl MemberJoinEvent {
    pub fn account_age(&self) -> chrono::Duration {
        self.joined_at - self.account_created_at
    }
}

/// Discord AutoMod blocked a message.
#[derive(Debug, Clone)]
pub struct AutoModBlockEvent {
    pub guild_id: String,
    pub channel_id: Option<String>,
    pub rule_id: String,
    pub user_id: String,
    /// Known only when the gateway cache has seen the user.
    pub user_name: Option<String>,
    pub avatar_url: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscordColor(pub u32);

impl DiscordColor {
    pub const DELETE_RED: DiscordColor = DiscordColor(0xDC322F);
    pub const UPDATE_BLUE: DiscordColor = DiscordColor(0x268BD2);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordEmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordEmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordEmbedFooter {
    pub text: String,
}

/// Platform-neutral embed. The Discord client turns this into a twilight
/// embed right before sending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscordEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<DiscordColor>,
    pub author: Option<DiscordEmbedAuthor>,
    pub footer: Option<DiscordEmbedFooter>,
    pub fields: Vec<DiscordEmbedField>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DiscordEmbed {
    pub fn new() -> Self {
        Self::default()
    }
}
