// File: src/antispam/heuristics.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use pulsar_common::models::HeuristicRule;

use super::log::{Fingerprint, LogEntry};

/// `<@123>` and the legacy nickname form `<@!123>`.
static USER_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<@!?(\d+)>").expect("user mention pattern is valid")
});

/// Result of a positive evaluation: the rule that fired and the history
/// entries it matched on.
#[derive(Debug, Clone)]
pub struct HeuristicMatch<'r> {
    pub rule: &'r HeuristicRule,
    pub entries: Vec<LogEntry>,
}

/// Narrow a cache snapshot down to one author's entries that have not been
/// acted upon yet.
pub fn author_history(snapshot: Vec<LogEntry>, author_id: &str) -> Vec<LogEntry> {
    snapshot
        .into_iter()
        .filter(|entry| entry.author_id == author_id && !entry.is_consumed())
        .collect()
}

pub fn count_mentions(content: &str) -> usize {
    USER_MENTION.find_iter(content).count()
}

/// Run the rules in order and return the first one whose thresholds are all
/// met. Later rules are not looked at once one matches.
pub fn evaluate<'r>(
    fingerprint: &Fingerprint,
    history: &[LogEntry],
    rules: &'r [HeuristicRule],
    now: DateTime<Utc>,
) -> Option<HeuristicMatch<'r>> {
    rules.iter().find_map(|rule| {
        evaluate_rule(fingerprint, history, rule, now)
            .map(|entries| HeuristicMatch { rule, entries })
    })
}

/// Check one rule against an author's history. Returns the entries the rule
/// matched on, or `None` when any configured threshold is not met.
pub fn evaluate_rule(
    fingerprint: &Fingerprint,
    history: &[LogEntry],
    rule: &HeuristicRule,
    now: DateTime<Utc>,
) -> Option<Vec<LogEntry>> {
    let thresholds = &rule.thresholds;

    let target: Vec<LogEntry> = history
        .iter()
        .filter(|entry| entry.age(now) <= thresholds.window)
        .filter(|entry| !rule.require_duplicate_content || entry.fingerprint == *fingerprint)
        .cloned()
        .collect();

    if target.is_empty() {
        return None;
    }

    if thresholds.min_messages > 0 && target.len() < thresholds.min_messages {
        return None;
    }

    if thresholds.min_distinct_channels > 0 {
        let channels: HashSet<&str> = target.iter().map(|e| e.channel_id.as_str()).collect();
        if channels.len() < thresholds.min_distinct_channels {
            return None;
        }
    }

    if thresholds.min_mentions > 0
        && !target
            .iter()
            .any(|entry| count_mentions(&entry.content) >= thresholds.min_mentions)
    {
        return None;
    }

    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_are_counted_per_marker() {
        assert_eq!(count_mentions("hello"), 0);
        assert_eq!(count_mentions("<@123> hi"), 1);
        assert_eq!(count_mentions("<@123><@!456> <@789>"), 3);
        // Role and channel mentions are not user mentions.
        assert_eq!(count_mentions("<@&123> <#456>"), 0);
        assert_eq!(count_mentions("<@abc>"), 0);
    }
}
