// File: pulsar-common/src/models/mod.rs
pub mod antispam;
pub mod discord;

pub use antispam::{HeuristicRule, Thresholds};
pub use discord::{
    AutoModBlockEvent, DiscordColor, DiscordEmbed, DiscordEmbedAuthor, DiscordEmbedField,
    DiscordEmbedFooter, MemberJoinEvent, MessageAttachment, MessageDeleteEvent, MessageEvent,
    MessageUpdateEvent,
};
