// File: src/services/antispam_service.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, trace, warn};

use pulsar_common::duration::format_duration;
use pulsar_common::models::{
    AutoModBlockEvent, DiscordEmbed, HeuristicRule, MemberJoinEvent, MessageDeleteEvent,
    MessageEvent, MessageUpdateEvent,
};
use pulsar_common::traits::ModerationApi;

use crate::Error;
use crate::antispam::{self, Fingerprint, LogEntry, RemediationReport, Remediator};
use crate::cache::RingBuffer;
use crate::config::AntiSpamSettings;
use crate::embeds;

/// What happened to an observed message deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDisposition {
    /// The message was removed by the anti-spam pass itself.
    RemovedAsSpam,
    /// Someone else removed it and a log entry was posted.
    Logged,
    /// Nothing to report (unknown message, bot author, hidden channel, or
    /// the log post failed).
    Ignored,
}

/// Message-create and message-delete handling for anti-spam.
///
/// Owns the recent-message ring; every event task shares one instance
/// behind an `Arc`.
pub struct AntiSpamService {
    settings: AntiSpamSettings,
    cache: RingBuffer<LogEntry>,
    remediator: Remediator,
    api: Arc<dyn ModerationApi>,
    log_channel_id: String,
}

impl AntiSpamService {
    pub fn new(
        settings: AntiSpamSettings,
        api: Arc<dyn ModerationApi>,
        log_channel_id: impl Into<String>,
    ) -> Result<Self, Error> {
        let log_channel_id = log_channel_id.into();
        let cache = RingBuffer::new(settings.message_cache_size)?;
        let remediator = Remediator::new(api.clone(), log_channel_id.clone());

        Ok(Self {
            settings,
            cache,
            remediator,
            api,
            log_channel_id,
        })
    }

    pub fn rules(&self) -> &[HeuristicRule] {
        &self.settings.rules
    }

    pub fn cache(&self) -> &RingBuffer<LogEntry> {
        &self.cache
    }

    /// Record a new message and act on it if it completes a spam pattern.
    /// Returns the remediation outcome when a rule matched.
    pub async fn handle_message_create(&self, message: &MessageEvent) -> Option<RemediationReport> {
        self.handle_message_create_at(message, Utc::now()).await
    }

    /// Same as [`handle_message_create`](Self::handle_message_create) with an
    /// explicit evaluation instant.
    pub async fn handle_message_create_at(
        &self,
        message: &MessageEvent,
        now: DateTime<Utc>,
    ) -> Option<RemediationReport> {
        if !self.should_track(message) {
            return None;
        }

        let fingerprint = Fingerprint::of_message(message);
        self.cache.add(LogEntry::new(message, fingerprint));
        trace!(
            message_id = %message.message_id,
            author_id = %message.author_id,
            fingerprint = ?fingerprint,
            "Cached message"
        );

        if self.cache.len() <= 1 {
            return None;
        }

        let history = antispam::author_history(self.cache.snapshot(), &message.author_id);
        let matched = antispam::evaluate(&fingerprint, &history, &self.settings.rules, now)?;

        warn!(
            author_id = %message.author_id,
            author = %message.author_name,
            rule_id = %matched.rule.id,
            matched = matched.entries.len(),
            "Spam heuristic matched"
        );

        Some(self.remediator.remediate(&self.cache, message, &matched).await)
    }

    /// Tell bot-initiated removals apart from everyone else's, and log the
    /// latter.
    pub async fn handle_message_delete(&self, event: &MessageDeleteEvent) -> DeleteDisposition {
        if self.was_removed_as_spam(&event.message_id) {
            trace!(message_id = %event.message_id, "Deleted message was removed as spam");
            return DeleteDisposition::RemovedAsSpam;
        }

        let Some(message) = event.before_delete.as_ref() else {
            debug!(message_id = %event.message_id, "No copy of deleted message; not logging");
            return DeleteDisposition::Ignored;
        };
        if message.author_is_bot {
            return DeleteDisposition::Ignored;
        }

        if !self.channel_visible(&event.channel_id).await {
            return DeleteDisposition::Ignored;
        }

        if self.post_log(&embeds::message_deleted(message)).await {
            DeleteDisposition::Logged
        } else {
            DeleteDisposition::Ignored
        }
    }

    /// Log an edit with the old and new text. Returns whether an entry was
    /// posted.
    pub async fn handle_message_update(&self, event: &MessageUpdateEvent) -> bool {
        let Some(before) = event.before.as_ref() else {
            debug!(message_id = %event.after.message_id, "No copy of edited message; not logging");
            return false;
        };
        let after = &event.after;
        if after.author_is_bot || after.guild_id.is_none() {
            return false;
        }
        // Embed unfurls also arrive as edits.
        if before.content == after.content && before.attachments.len() == after.attachments.len() {
            return false;
        }
        if !self.channel_visible(&after.channel_id).await {
            return false;
        }

        self.post_log(&embeds::message_edited(before, after, event.edited_at))
            .await
    }

    /// Flag members whose account is younger than `minimum_account_age`.
    pub async fn handle_member_join(&self, member: &MemberJoinEvent) -> bool {
        let threshold = self.settings.minimum_account_age;
        if member.is_bot || threshold <= Duration::zero() {
            return false;
        }

        let age = member.account_age();
        if age > threshold {
            return false;
        }

        info!(
            user_id = %member.user_id,
            guild_id = %member.guild_id,
            age = %format_duration(age),
            "Recently created account joined"
        );
        self.post_log(&embeds::suspicious_account(member)).await
    }

    pub async fn handle_automod_block(&self, event: &AutoModBlockEvent) -> bool {
        info!(user_id = %event.user_id, rule_id = %event.rule_id, "AutoMod blocked a message");
        self.post_log(&embeds::automod_blocked(event)).await
    }

    pub fn was_removed_as_spam(&self, message_id: &str) -> bool {
        let mut consumed = false;
        self.cache.for_each(|entry| {
            if entry.message_id == message_id && entry.is_consumed() {
                consumed = true;
            }
        });
        consumed
    }

    async fn channel_visible(&self, channel_id: &str) -> bool {
        match self.api.can_view_channel(channel_id).await {
            Ok(visible) => visible,
            Err(e) => {
                warn!(channel_id, "Permission query failed; not logging: {e}");
                false
            }
        }
    }

    async fn post_log(&self, embed: &DiscordEmbed) -> bool {
        match self.api.send_alert(&self.log_channel_id, embed).await {
            Ok(()) => true,
            Err(e) => {
                warn!(log_channel_id = %self.log_channel_id, "Failed to post to the log channel: {e}");
                false
            }
        }
    }

    fn should_track(&self, message: &MessageEvent) -> bool {
        if !self.settings.enabled || message.author_is_bot {
            return false;
        }

        if let Some(role) = self
            .settings
            .excluded_role_ids
            .iter()
            .find(|role| message.has_role(role))
        {
            trace!(author_id = %message.author_id, role_id = %role, "Author has an excluded role");
            return false;
        }

        !(message.content.is_empty() && message.attachments.is_empty())
    }
}
