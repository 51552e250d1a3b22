// File: src/platforms/discord/runtime.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt};
use twilight_model::channel::Message;
use twilight_model::channel::Attachment;
use twilight_model::gateway::payload::incoming::{
    AutoModerationActionExecution, MemberAdd, Ready as ReadyPayload,
};
use twilight_model::guild::auto_moderation::AutoModerationActionType;
use twilight_model::id::Id;
use twilight_model::id::marker::{MessageMarker, UserMarker};
use twilight_model::util::{ImageHash, Timestamp};
use twilight_util::snowflake::Snowflake;

use crate::Error;
use crate::services::AntiSpamService;
use pulsar_common::models::{
    AutoModBlockEvent, MemberJoinEvent, MessageAttachment, MessageDeleteEvent, MessageEvent,
    MessageUpdateEvent,
};

/// Messages kept per channel so deletions and edits can be reported with
/// content.
const DELETE_LOG_CACHE_SIZE: usize = 200;

pub const INTENTS: Intents = Intents::GUILDS
    .union(Intents::GUILD_MEMBERS)
    .union(Intents::GUILD_MESSAGES)
    .union(Intents::MESSAGE_CONTENT)
    .union(Intents::AUTO_MODERATION_EXECUTION);

const EVENT_TYPES: EventTypeFlags = EventTypeFlags::READY
    .union(EventTypeFlags::MESSAGE_CREATE)
    .union(EventTypeFlags::MESSAGE_UPDATE)
    .union(EventTypeFlags::MESSAGE_DELETE)
    .union(EventTypeFlags::MEMBER_ADD)
    .union(EventTypeFlags::AUTO_MODERATION_ACTION_EXECUTION);

/// Run a single gateway shard and feed message events into `service` until
/// the connection is closed for good.
///
/// Each event is handled on its own task, so a slow remediation never holds
/// up the gateway.
pub async fn run_gateway(token: String, service: Arc<AntiSpamService>) -> Result<(), Error> {
    let mut shard = Shard::new(ShardId::ONE, token, INTENTS);
    let cache: InMemoryCache = InMemoryCache::builder()
        .resource_types(ResourceType::MESSAGE | ResourceType::USER)
        .message_cache_size(DELETE_LOG_CACHE_SIZE)
        .build();

    let mut bot_user_id: Option<Id<UserMarker>> = None;
    info!("Gateway shard started; listening for message events");

    while let Some(item) = shard.next_event(EVENT_TYPES).await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                error!("Error receiving gateway event: {e:?}");
                continue;
            }
        };

        // The cache drops or rewrites the message on update, so read it first.
        let previous = match &event {
            Event::MessageDelete(deleted) => cached_message_event(&cache, deleted.id),
            Event::MessageUpdate(updated) => cached_message_event(&cache, updated.id),
            _ => None,
        };
        cache.update(&event);

        match event {
            Event::Ready(ready) => {
                let data: &ReadyPayload = ready.as_ref();
                info!("READY as {} (ID={})", data.user.name, data.user.id);
                bot_user_id = Some(data.user.id);
            }
            Event::MessageCreate(created) => {
                let msg: &Message = &created.0;
                if Some(msg.author.id) == bot_user_id || msg.author.bot {
                    trace!("Ignoring bot message from {}", msg.author.name);
                    continue;
                }
                if msg.guild_id.is_none() {
                    trace!("Ignoring direct message {}", msg.id);
                    continue;
                }

                let message = message_event(msg);
                let service = service.clone();
                tokio::spawn(async move {
                    service.handle_message_create(&message).await;
                });
            }
            Event::MessageDelete(deleted) => {
                let event = MessageDeleteEvent {
                    message_id: deleted.id.to_string(),
                    channel_id: deleted.channel_id.to_string(),
                    guild_id: deleted.guild_id.map(|g| g.to_string()),
                    before_delete: previous,
                };
                let service = service.clone();
                tokio::spawn(async move {
                    let disposition = service.handle_message_delete(&event).await;
                    debug!(message_id = %event.message_id, ?disposition, "Handled message deletion");
                });
            }
            Event::MessageUpdate(updated) => {
                let msg: &Message = &updated.0;
                if Some(msg.author.id) == bot_user_id || msg.author.bot || msg.guild_id.is_none() {
                    continue;
                }

                let event = MessageUpdateEvent {
                    before: previous,
                    after: message_event(msg),
                    edited_at: msg.edited_timestamp.map(to_utc),
                };
                let service = service.clone();
                tokio::spawn(async move {
                    let logged = service.handle_message_update(&event).await;
                    debug!(message_id = %event.after.message_id, logged, "Handled message edit");
                });
            }
            Event::MemberAdd(added) => {
                let member = member_join_event(&added);
                let service = service.clone();
                tokio::spawn(async move {
                    service.handle_member_join(&member).await;
                });
            }
            Event::AutoModerationActionExecution(execution) => {
                // One execution arrives per configured action; log the block only.
                if execution.action.kind != AutoModerationActionType::BlockMessage {
                    continue;
                }

                let event = automod_block_event(&cache, &execution);
                let service = service.clone();
                tokio::spawn(async move {
                    service.handle_automod_block(&event).await;
                });
            }
            other => {
                trace!("Unhandled gateway event: {:?}", other.kind());
            }
        }
    }

    warn!("Gateway shard event loop ended");
    Ok(())
}

fn to_utc(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.as_micros()).unwrap_or_else(Utc::now)
}

fn avatar_url(user_id: Id<UserMarker>, hash: ImageHash) -> String {
    format!("https://cdn.discordapp.com/avatars/{user_id}/{hash}.png")
}

fn attachments(attachments: &[Attachment]) -> Vec<MessageAttachment> {
    attachments
        .iter()
        .map(|a| MessageAttachment {
            filename: a.filename.clone(),
            content_type: a.content_type.clone(),
        })
        .collect()
}

pub(crate) fn message_event(msg: &Message) -> MessageEvent {
    let role_ids = msg
        .member
        .as_ref()
        .map(|m| m.roles.iter().map(|r| r.to_string()).collect())
        .unwrap_or_default();

    MessageEvent {
        message_id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        guild_id: msg.guild_id.map(|g| g.to_string()),
        author_id: msg.author.id.to_string(),
        author_name: msg.author.name.clone(),
        author_avatar_url: msg.author.avatar.map(|hash| avatar_url(msg.author.id, hash)),
        author_is_bot: msg.author.bot,
        role_ids,
        content: msg.content.clone(),
        attachments: attachments(&msg.attachments),
        timestamp: to_utc(msg.timestamp),
    }
}

fn cached_message_event(cache: &InMemoryCache, id: Id<MessageMarker>) -> Option<MessageEvent> {
    let message = cache.message(id)?;
    let author_id = message.author();
    let author = cache.user(author_id);

    Some(MessageEvent {
        message_id: id.to_string(),
        channel_id: message.channel_id().to_string(),
        guild_id: message.guild_id().map(|g| g.to_string()),
        author_id: author_id.to_string(),
        author_name: author
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_else(|| author_id.to_string()),
        author_avatar_url: author
            .as_ref()
            .and_then(|u| u.avatar.map(|hash| avatar_url(author_id, hash))),
        author_is_bot: author.as_ref().is_some_and(|u| u.bot),
        role_ids: Vec::new(),
        content: message.content().to_string(),
        attachments: attachments(message.attachments()),
        timestamp: to_utc(message.timestamp()),
    })
}

/// Account creation time encoded in a user ID.
fn account_created_at(user_id: Id<UserMarker>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(user_id.timestamp()).unwrap_or_else(Utc::now)
}

fn member_join_event(added: &MemberAdd) -> MemberJoinEvent {
    let user = &added.member.user;
    MemberJoinEvent {
        guild_id: added.guild_id.to_string(),
        user_id: user.id.to_string(),
        user_name: user.name.clone(),
        avatar_url: user.avatar.map(|hash| avatar_url(user.id, hash)),
        is_bot: user.bot,
        verified: user.verified,
        account_created_at: account_created_at(user.id),
        joined_at: added.member.joined_at.map(to_utc).unwrap_or_else(Utc::now),
    }
}

fn automod_block_event(
    cache: &InMemoryCache,
    execution: &AutoModerationActionExecution,
) -> AutoModBlockEvent {
    let user = cache.user(execution.user_id);
    AutoModBlockEvent {
        guild_id: execution.guild_id.to_string(),
        channel_id: execution.channel_id.map(|c| c.to_string()),
        rule_id: execution.rule_id.to_string(),
        user_id: execution.user_id.to_string(),
        user_name: user.as_ref().map(|u| u.name.clone()),
        avatar_url: user
            .as_ref()
            .and_then(|u| u.avatar.map(|hash| avatar_url(execution.user_id, hash))),
        content: execution.content.clone(),
    }
}
