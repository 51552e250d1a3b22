// File: pulsar-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use pulsar_common::models::{
    DiscordEmbed, DiscordEmbedField, HeuristicRule, MessageEvent, Thresholds,
};
use pulsar_common::traits::ModerationApi;
use pulsar_core::Error;

pub const GUILD_ID: &str = "100";
pub const LOG_CHANNEL_ID: &str = "900";

/// Every platform call a `RecordingApi` saw, in order.
#[derive(Debug, Clone)]
pub enum ApiCall {
    Delete {
        channel_id: String,
        message_ids: Vec<String>,
    },
    Restrict {
        guild_id: String,
        author_id: String,
        until: DateTime<Utc>,
    },
    Alert {
        channel_id: String,
        embed: DiscordEmbed,
    },
    CanView {
        channel_id: String,
    },
}

/// In-memory `ModerationApi` that records calls and fails on request.
#[derive(Default)]
pub struct RecordingApi {
    failing_delete_channels: HashSet<String>,
    hidden_channels: HashSet<String>,
    visibility_errors: bool,
    restrict_errors: bool,
    pub calls: Mutex<Vec<ApiCall>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_deletes_in(mut self, channel_id: &str) -> Self {
        self.failing_delete_channels.insert(channel_id.to_string());
        self
    }

    pub fn hide_channel(mut self, channel_id: &str) -> Self {
        self.hidden_channels.insert(channel_id.to_string());
        self
    }

    pub fn fail_visibility_checks(mut self) -> Self {
        self.visibility_errors = true;
        self
    }

    pub fn fail_restrictions(mut self) -> Self {
        self.restrict_errors = true;
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn deletes(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Delete { channel_id, message_ids } => Some((channel_id, message_ids)),
                _ => None,
            })
            .collect()
    }

    pub fn restrictions(&self) -> Vec<(String, String, DateTime<Utc>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Restrict { guild_id, author_id, until } => Some((guild_id, author_id, until)),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<(String, DiscordEmbed)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Alert { channel_id, embed } => Some((channel_id, embed)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ModerationApi for RecordingApi {
    async fn bulk_delete_messages(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> Result<usize, Error> {
        self.calls.lock().push(ApiCall::Delete {
            channel_id: channel_id.to_string(),
            message_ids: message_ids.to_vec(),
        });
        if self.failing_delete_channels.contains(channel_id) {
            return Err(Error::Platform(format!("Missing access to {channel_id}")));
        }
        Ok(message_ids.len())
    }

    async fn restrict_author(
        &self,
        guild_id: &str,
        author_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.calls.lock().push(ApiCall::Restrict {
            guild_id: guild_id.to_string(),
            author_id: author_id.to_string(),
            until,
        });
        if self.restrict_errors {
            return Err(Error::Platform("Missing permissions".into()));
        }
        Ok(())
    }

    async fn send_alert(&self, channel_id: &str, embed: &DiscordEmbed) -> Result<(), Error> {
        self.calls.lock().push(ApiCall::Alert {
            channel_id: channel_id.to_string(),
            embed: embed.clone(),
        });
        Ok(())
    }

    async fn can_view_channel(&self, channel_id: &str) -> Result<bool, Error> {
        self.calls.lock().push(ApiCall::CanView {
            channel_id: channel_id.to_string(),
        });
        if self.visibility_errors {
            return Err(Error::Platform("Unknown channel".into()));
        }
        Ok(!self.hidden_channels.contains(channel_id))
    }
}

pub fn message(
    id: &str,
    channel_id: &str,
    author_id: &str,
    content: &str,
    timestamp: DateTime<Utc>,
) -> MessageEvent {
    MessageEvent {
        message_id: id.to_string(),
        channel_id: channel_id.to_string(),
        guild_id: Some(GUILD_ID.to_string()),
        author_id: author_id.to_string(),
        author_name: format!("user-{author_id}"),
        author_avatar_url: None,
        author_is_bot: false,
        role_ids: Vec::new(),
        content: content.to_string(),
        attachments: Vec::new(),
        timestamp,
    }
}

pub fn rule(id: &str, duplicated: bool, messages: usize, channels: usize, window_secs: i64) -> HeuristicRule {
    HeuristicRule {
        id: id.to_string(),
        require_duplicate_content: duplicated,
        thresholds: Thresholds {
            min_messages: messages,
            min_distinct_channels: channels,
            min_mentions: 0,
            window: Duration::seconds(window_secs),
        },
        timeout: Duration::minutes(10),
    }
}

/// The embed field titled `name`, if any.
pub fn embed_field<'a>(embed: &'a DiscordEmbed, name: &str) -> Option<&'a DiscordEmbedField> {
    embed.fields.iter().find(|f| f.name == name)
}
