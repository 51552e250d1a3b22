// File: src/antispam/remediation.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use pulsar_common::models::{HeuristicRule, MessageEvent};
use pulsar_common::traits::ModerationApi;

use crate::cache::RingBuffer;
use crate::embeds;

use super::heuristics::HeuristicMatch;
use super::log::LogEntry;

/// What a remediation pass ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationReport {
    pub rule_id: String,
    /// Channels the matched messages were posted in, first-seen order.
    pub channels: Vec<String>,
    /// Deletions the platform confirmed.
    pub deleted: usize,
    /// Cache entries this pass flagged as consumed.
    pub consumed: usize,
    pub restricted: bool,
    pub alerted: bool,
}

/// Turns a positive heuristic match into cache updates and platform calls.
///
/// Every platform call is attempted once. A failure is logged and the
/// remaining steps still run; the only coupling between steps is that the
/// alert needs more than one confirmed deletion.
pub struct Remediator {
    api: Arc<dyn ModerationApi>,
    alert_channel_id: String,
}

impl Remediator {
    pub fn new(api: Arc<dyn ModerationApi>, alert_channel_id: impl Into<String>) -> Self {
        Self {
            api,
            alert_channel_id: alert_channel_id.into(),
        }
    }

    pub async fn remediate(
        &self,
        cache: &RingBuffer<LogEntry>,
        trigger: &MessageEvent,
        matched: &HeuristicMatch<'_>,
    ) -> RemediationReport {
        let rule = matched.rule;
        let partitions = partition_by_channel(&matched.entries);
        let channels: Vec<String> = partitions.iter().map(|(c, _)| c.clone()).collect();

        // Flag first: the platform echoes our own deletions back as delete
        // events, and those must already read as consumed.
        let consumed = mark_consumed(cache, &matched.entries);
        let deleted = self.delete_partitions(&partitions).await;
        let restricted = self.restrict(trigger, rule).await;

        let alerted = if deleted > 1 {
            self.alert(trigger, rule, deleted, &channels).await
        } else {
            debug!(
                rule_id = %rule.id,
                deleted,
                "Not enough confirmed deletions for an anti-spam alert"
            );
            false
        };

        info!(
            author_id = %trigger.author_id,
            rule_id = %rule.id,
            matched = matched.entries.len(),
            deleted,
            consumed,
            restricted,
            alerted,
            "Anti-spam remediation finished"
        );

        RemediationReport {
            rule_id: rule.id.clone(),
            channels,
            deleted,
            consumed,
            restricted,
            alerted,
        }
    }

    async fn delete_partitions(&self, partitions: &[(String, Vec<String>)]) -> usize {
        let mut deleted = 0;
        for (channel_id, message_ids) in partitions {
            match self.api.bulk_delete_messages(channel_id, message_ids).await {
                Ok(count) => {
                    debug!(channel_id = %channel_id, count, "Deleted spam messages");
                    deleted += count.min(message_ids.len());
                }
                Err(e) => {
                    warn!(
                        channel_id = %channel_id,
                        messages = message_ids.len(),
                        "Failed to delete spam messages: {e}"
                    );
                }
            }
        }
        deleted
    }

    async fn restrict(&self, trigger: &MessageEvent, rule: &HeuristicRule) -> bool {
        let Some(guild_id) = trigger.guild_id.as_deref() else {
            warn!(author_id = %trigger.author_id, "Message has no guild; cannot time out author");
            return false;
        };

        let until = Utc::now() + rule.timeout;
        match self.api.restrict_author(guild_id, &trigger.author_id, until).await {
            Ok(()) => true,
            Err(e) => {
                warn!(author_id = %trigger.author_id, "Failed to time out author: {e}");
                false
            }
        }
    }

    async fn alert(
        &self,
        trigger: &MessageEvent,
        rule: &HeuristicRule,
        deleted: usize,
        channels: &[String],
    ) -> bool {
        match self.api.can_view_channel(&trigger.channel_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(channel_id = %trigger.channel_id, "Channel is hidden; alert suppressed");
                return false;
            }
            Err(e) => {
                warn!(channel_id = %trigger.channel_id, "Permission query failed; alert suppressed: {e}");
                return false;
            }
        }

        let embed = embeds::antispam_alert(trigger, rule, deleted, channels);
        match self.api.send_alert(&self.alert_channel_id, &embed).await {
            Ok(()) => true,
            Err(e) => {
                warn!(alert_channel_id = %self.alert_channel_id, "Failed to send anti-spam alert: {e}");
                false
            }
        }
    }
}

/// Group message IDs by channel, keeping channels in first-seen order.
fn partition_by_channel(entries: &[LogEntry]) -> Vec<(String, Vec<String>)> {
    let mut partitions: Vec<(String, Vec<String>)> = Vec::new();
    for entry in entries {
        match partitions.iter_mut().find(|(c, _)| *c == entry.channel_id) {
            Some((_, ids)) => ids.push(entry.message_id.clone()),
            None => partitions.push((entry.channel_id.clone(), vec![entry.message_id.clone()])),
        }
    }
    partitions
}

fn mark_consumed(cache: &RingBuffer<LogEntry>, entries: &[LogEntry]) -> usize {
    let ids: HashSet<&str> = entries.iter().map(|e| e.message_id.as_str()).collect();
    let mut flipped = 0;
    cache.for_each_mut(|entry| {
        if ids.contains(entry.message_id.as_str()) && entry.mark_consumed() {
            flipped += 1;
        }
    });
    flipped
}
