// File: src/embeds.rs
//
// Embeds posted to the moderation log channel.

use chrono::{DateTime, Utc};

use pulsar_common::duration::format_duration;
use pulsar_common::models::{
    AutoModBlockEvent, DiscordColor, DiscordEmbed, DiscordEmbedAuthor, DiscordEmbedField,
    DiscordEmbedFooter, HeuristicRule, MemberJoinEvent, MessageAttachment, MessageEvent,
};

const DISCORD_CHANNELS_URL: &str = "https://discord.com/channels";

/// Discord's limit on an embed field value.
pub const MAX_CONTENT_LENGTH: usize = 1024;
const TRUNCATED_MARKER: &str = "\n\n<truncated>";

/// Cut `content` so that it fits in an embed field, marking the cut.
pub fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_LENGTH {
        return content.to_string();
    }

    let keep = MAX_CONTENT_LENGTH - TRUNCATED_MARKER.chars().count();
    let mut out: String = content.chars().take(keep).collect();
    out.push_str(TRUNCATED_MARKER);
    out
}

/// Message text followed by one `<filename (content-type)>` line per
/// attachment, truncated to fit a field.
pub fn build_content_field(content: &str, attachments: &[MessageAttachment]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(attachments.len() + 1);
    if !content.is_empty() {
        lines.push(content.to_string());
    }
    for attachment in attachments {
        let kind = attachment.content_type.as_deref().unwrap_or("unknown");
        lines.push(format!("<{} ({})>", attachment.filename, kind));
    }

    if lines.is_empty() {
        return "_no content_".to_string();
    }
    truncate_content(&lines.join("\n"))
}

fn author_of(message: &MessageEvent) -> DiscordEmbedAuthor {
    DiscordEmbedAuthor {
        name: message.author_name.clone(),
        icon_url: message.author_avatar_url.clone(),
    }
}

/// Summary posted after a spam burst was cleaned up.
pub fn antispam_alert(
    trigger: &MessageEvent,
    rule: &HeuristicRule,
    deleted: usize,
    channels: &[String],
) -> DiscordEmbed {
    let mut embed = DiscordEmbed::new();
    embed.title = Some(":shield: Anti-spam alert".to_string());
    embed.description = Some(format!(
        "{deleted} message(s) automatically removed from {} channel(s) due to suspected \
         spam or advertising activity by <@{}>. The user has been timed out for {}. \
         _Please exercise caution: these messages may contain malicious links, phishing \
         attempts, or other harmful content_",
        channels.len(),
        trigger.author_id,
        format_duration(rule.timeout),
    ));
    embed.color = Some(DiscordColor::DELETE_RED);
    embed.author = Some(author_of(trigger));
    embed.footer = Some(DiscordEmbedFooter {
        text: format!("ID: {} | HEURISTIC: {}", trigger.author_id, rule.id),
    });
    embed.timestamp = Some(Utc::now());

    if rule.require_duplicate_content {
        embed.fields.push(DiscordEmbedField {
            name: "Contents".to_string(),
            value: build_content_field(&trigger.content, &trigger.attachments),
            inline: false,
        });
    }

    let mentions: Vec<String> = channels.iter().map(|c| format!("<#{c}>")).collect();
    embed.fields.push(DiscordEmbedField {
        name: "Channel(s)".to_string(),
        value: truncate_content(&mentions.join(" ")),
        inline: false,
    });

    embed
}

/// Log entry for a message removed by someone other than the anti-spam pass.
pub fn message_deleted(message: &MessageEvent) -> DiscordEmbed {
    let mut embed = DiscordEmbed::new();
    embed.description = Some(format!(
        "**:wastebasket: Message deleted by <@!{}> in <#{}>**",
        message.author_id, message.channel_id
    ));
    embed.color = Some(DiscordColor::DELETE_RED);
    embed.author = Some(author_of(message));
    embed.footer = Some(DiscordEmbedFooter {
        text: format!("ID: {}", message.message_id),
    });
    embed.timestamp = Some(message.timestamp);
    embed.fields.push(DiscordEmbedField {
        name: "Contents".to_string(),
        value: build_content_field(&message.content, &message.attachments),
        inline: false,
    });
    embed
}

/// Jump link to a guild message.
pub fn message_link(message: &MessageEvent) -> String {
    format!(
        "{DISCORD_CHANNELS_URL}/{}/{}/{}",
        message.guild_id.as_deref().unwrap_or("@me"),
        message.channel_id,
        message.message_id
    )
}

/// Before/after log entry for an edited message.
pub fn message_edited(
    before: &MessageEvent,
    after: &MessageEvent,
    edited_at: Option<DateTime<Utc>>,
) -> DiscordEmbed {
    let mut embed = DiscordEmbed::new();
    embed.description = Some(format!(
        "**:pencil: [Message]({}) edited by <@!{}> in <#{}>**",
        message_link(after),
        after.author_id,
        after.channel_id
    ));
    embed.color = Some(DiscordColor::UPDATE_BLUE);
    embed.author = Some(author_of(after));
    embed.footer = Some(DiscordEmbedFooter {
        text: format!("ID: {}", after.message_id),
    });
    embed.timestamp = Some(edited_at.unwrap_or_else(Utc::now));
    embed.fields.push(DiscordEmbedField {
        name: "Before".to_string(),
        value: build_content_field(&before.content, &before.attachments),
        inline: true,
    });
    embed.fields.push(DiscordEmbedField {
        name: "After".to_string(),
        value: build_content_field(&after.content, &after.attachments),
        inline: true,
    });
    embed
}

/// Warning posted when a freshly created account joins.
pub fn suspicious_account(member: &MemberJoinEvent) -> DiscordEmbed {
    let verified = match member.verified {
        Some(false) => "**unverified**",
        _ => "verified",
    };

    let mut embed = DiscordEmbed::new();
    embed.title = Some(":shield: Suspected spam or advertising account".to_string());
    embed.description = Some(format!(
        "User <@{}> joined with a recently created {verified} account, it may be used for \
         spam or advertising - exercise caution",
        member.user_id
    ));
    embed.color = Some(DiscordColor::UPDATE_BLUE);
    embed.author = Some(DiscordEmbedAuthor {
        name: member.user_name.clone(),
        icon_url: member.avatar_url.clone(),
    });
    embed.footer = Some(DiscordEmbedFooter {
        text: format!("ID: {}", member.user_id),
    });
    embed.timestamp = Some(Utc::now());
    embed.fields.push(DiscordEmbedField {
        name: "Account age".to_string(),
        value: format_duration(member.account_age()),
        inline: false,
    });
    embed
}

/// Notice that Discord AutoMod blocked a message.
pub fn automod_blocked(event: &AutoModBlockEvent) -> DiscordEmbed {
    let channel = event
        .channel_id
        .as_deref()
        .map(|c| format!("<#{c}>"))
        .unwrap_or_else(|| "an unknown channel".to_string());

    let mut embed = DiscordEmbed::new();
    embed.description = Some(format!(
        "**:tools: AutoMod action triggered**: message sent by <@!{}> in {channel} flagged. \
         _Please do not click any links it may contain as they may be dangerous_",
        event.user_id
    ));
    embed.color = Some(DiscordColor::DELETE_RED);
    embed.author = Some(DiscordEmbedAuthor {
        name: event.user_name.clone().unwrap_or_else(|| event.user_id.clone()),
        icon_url: event.avatar_url.clone(),
    });
    embed.footer = Some(DiscordEmbedFooter {
        text: format!("Rule: {}", event.rule_id),
    });
    embed.timestamp = Some(Utc::now());
    embed.fields.push(DiscordEmbedField {
        name: "Contents".to_string(),
        value: build_content_field(&event.content, &[]),
        inline: false,
    });
    embed
}
