// File: pulsar-common/src/traits/api.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::models::discord::DiscordEmbed;

/// ---------------------------------------------------------------------------
/// ModerationApi
///
/// The side-effecting calls the anti-spam engine makes against the chat
/// platform. The engine only issues intents; connection handling, retries
/// and request deadlines belong to the implementor.
/// ---------------------------------------------------------------------------
#[async_trait]
pub trait ModerationApi: Send + Sync {
    /// Delete `message_ids` from one channel. Returns how many deletions the
    /// platform confirmed.
    async fn bulk_delete_messages(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> Result<usize, Error>;

    /// Time the author out until `until`.
    async fn restrict_author(
        &self,
        guild_id: &str,
        author_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(), Error>;

    async fn send_alert(&self, channel_id: &str, embed: &DiscordEmbed) -> Result<(), Error>;

    /// Whether regular members can see the channel. Always asks the
    /// platform; permission overwrites are never cached.
    async fn can_view_channel(&self, channel_id: &str) -> Result<bool, Error>;
}
