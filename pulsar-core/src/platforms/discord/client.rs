// File: src/platforms/discord/client.rs

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::channel::message::Embed;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GenericMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{
    EmbedAuthorBuilder, EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource,
};

use crate::Error;
use pulsar_common::models::DiscordEmbed;
use pulsar_common::traits::ModerationApi;

/// Discord's bulk-delete endpoint accepts at most this many IDs per call.
const BULK_DELETE_LIMIT: usize = 100;

/// `ModerationApi` over the Discord REST API.
///
/// Every request is bounded by `request_timeout`, on top of the HTTP
/// client's own timeout.
pub struct DiscordModerationClient {
    http: Arc<HttpClient>,
    request_timeout: Duration,
}

impl DiscordModerationClient {
    pub fn new(token: String, request_timeout: Duration) -> Self {
        let http = ClientBuilder::new()
            .token(token)
            .timeout(request_timeout)
            .build();

        Self {
            http: Arc::new(http),
            request_timeout,
        }
    }

    /// Run one request under the deadline.
    async fn send<F, T>(&self, request: F) -> Result<T, Error>
    where
        F: IntoFuture<Output = Result<T, twilight_http::Error>>,
    {
        Ok(tokio::time::timeout(self.request_timeout, request).await??)
    }
}

pub(crate) fn parse_id<T>(raw: &str) -> Result<Id<T>, Error> {
    raw.parse::<u64>()
        .ok()
        .and_then(Id::new_checked)
        .ok_or_else(|| Error::Platform(format!("Invalid Discord ID: {raw}")))
}

/// Convert the platform-neutral embed model into a validated twilight embed.
pub(crate) fn to_twilight_embed(embed: &DiscordEmbed) -> Result<Embed, Error> {
    let mut builder = EmbedBuilder::new();

    if let Some(title) = &embed.title {
        builder = builder.title(title.clone());
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description.clone());
    }
    if let Some(color) = embed.color {
        builder = builder.color(color.0);
    }
    if let Some(author) = &embed.author {
        let mut author_builder = EmbedAuthorBuilder::new(author.name.clone());
        if let Some(url) = &author.icon_url {
            match ImageSource::url(url.clone()) {
                Ok(source) => author_builder = author_builder.icon_url(source),
                Err(e) => debug!("Skipping embed author icon {url}: {e}"),
            }
        }
        builder = builder.author(author_builder);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(EmbedFooterBuilder::new(footer.text.clone()));
    }
    for field in &embed.fields {
        let mut field_builder = EmbedFieldBuilder::new(field.name.clone(), field.value.clone());
        if field.inline {
            field_builder = field_builder.inline();
        }
        builder = builder.field(field_builder);
    }
    if let Some(ts) = embed.timestamp {
        match Timestamp::from_micros(ts.timestamp_micros()) {
            Ok(ts) => builder = builder.timestamp(ts),
            Err(e) => debug!("Skipping embed timestamp: {e}"),
        }
    }

    builder
        .validate()
        .map(EmbedBuilder::build)
        .map_err(|e| Error::Platform(format!("Invalid embed: {e}")))
}

#[async_trait]
impl ModerationApi for DiscordModerationClient {
    async fn bulk_delete_messages(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> Result<usize, Error> {
        let channel = parse_id::<ChannelMarker>(channel_id)?;
        let ids = message_ids
            .iter()
            .map(|id| parse_id::<MessageMarker>(id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut deleted = 0;
        let mut last_error = None;
        for chunk in ids.chunks(BULK_DELETE_LIMIT) {
            // The bulk endpoint refuses fewer than two IDs.
            let outcome = match chunk {
                [single] => self.send(self.http.delete_message(channel, *single)).await.map(drop),
                many => self.send(self.http.delete_messages(channel, many)).await.map(drop),
            };
            match outcome {
                Ok(()) => deleted += chunk.len(),
                Err(e) => {
                    warn!(channel_id, messages = chunk.len(), "Discord delete failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if deleted == 0 => Err(e),
            _ => Ok(deleted),
        }
    }

    async fn restrict_author(
        &self,
        guild_id: &str,
        author_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(), Error> {
        let guild = parse_id::<GuildMarker>(guild_id)?;
        let user = parse_id::<UserMarker>(author_id)?;
        let until = Timestamp::from_secs(until.timestamp())
            .map_err(|e| Error::Platform(format!("Invalid timeout timestamp: {e}")))?;

        self.send(
            self.http
                .update_guild_member(guild, user)
                .communication_disabled_until(Some(until)),
        )
        .await?;
        Ok(())
    }

    async fn send_alert(&self, channel_id: &str, embed: &DiscordEmbed) -> Result<(), Error> {
        let channel = parse_id::<ChannelMarker>(channel_id)?;
        let embeds = [to_twilight_embed(embed)?];

        self.send(self.http.create_message(channel).embeds(&embeds))
            .await?;
        Ok(())
    }

    async fn can_view_channel(&self, channel_id: &str) -> Result<bool, Error> {
        let channel_id = parse_id::<ChannelMarker>(channel_id)?;
        let channel = self.send(self.http.channel(channel_id)).await?.model().await?;

        // DMs and other guild-less channels have no @everyone role to deny.
        let Some(guild_id) = channel.guild_id else {
            return Ok(true);
        };
        let everyone: Id<GenericMarker> = guild_id.cast();

        let hidden = channel
            .permission_overwrites
            .unwrap_or_default()
            .iter()
            .any(|overwrite| {
                overwrite.id == everyone && overwrite.deny.contains(Permissions::VIEW_CHANNEL)
            });
        Ok(!hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsar_common::models::{DiscordColor, DiscordEmbedField, DiscordEmbedFooter};

    #[test]
    fn ids_must_be_non_zero_integers() {
        assert!(parse_id::<ChannelMarker>("1234567890").is_ok());
        assert!(parse_id::<ChannelMarker>("0").is_err());
        assert!(parse_id::<ChannelMarker>("general").is_err());
        assert!(parse_id::<ChannelMarker>("").is_err());
    }

    #[test]
    fn embed_model_converts() {
        let mut embed = DiscordEmbed::new();
        embed.title = Some("title".into());
        embed.description = Some("description".into());
        embed.color = Some(DiscordColor::DELETE_RED);
        embed.footer = Some(DiscordEmbedFooter { text: "footer".into() });
        embed.fields.push(DiscordEmbedField {
            name: "Channel(s)".into(),
            value: "<#1>".into(),
            inline: false,
        });
        embed.timestamp = Some(Utc::now());

        let converted = to_twilight_embed(&embed).unwrap();
        assert_eq!(converted.title.as_deref(), Some("title"));
        assert_eq!(converted.color, Some(0xDC322F));
        assert_eq!(converted.fields.len(), 1);
        assert_eq!(converted.fields[0].name, "Channel(s)");
        assert!(converted.timestamp.is_some());
    }

    #[test]
    fn oversized_embed_is_rejected() {
        let mut embed = DiscordEmbed::new();
        embed.title = Some("t".repeat(1000));
        assert!(to_twilight_embed(&embed).is_err());
    }
}
