// File: pulsar-common/src/models/antispam.rs

use chrono::Duration;
use serde::Deserialize;

/// Thresholds a rule has to meet before it fires. A zero threshold is not
/// part of the check at all.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thresholds {
    #[serde(rename = "messages", default)]
    pub min_messages: usize,

    #[serde(rename = "channels", default)]
    pub min_distinct_channels: usize,

    /// Per message: one message carrying this many user mentions is enough.
    #[serde(rename = "mentions", default)]
    pub min_mentions: usize,

    /// Only history younger than this (relative to evaluation time) counts.
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub window: Duration,
}

impl Thresholds {
    /// True when at least one count threshold is configured.
    pub fn any_configured(&self) -> bool {
        self.min_messages > 0 || self.min_distinct_channels > 0 || self.min_mentions > 0
    }
}

/// One configured detection policy. Rules are kept in an ordered list and
/// the first one that matches wins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeuristicRule {
    pub id: String,

    #[serde(rename = "duplicated", default)]
    pub require_duplicate_content: bool,

    pub thresholds: Thresholds,

    /// How long the author is timed out for when this rule matches.
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Rules {
        rules: Vec<HeuristicRule>,
    }

    #[test]
    fn deserialize_rule_from_toml() {
        let raw = r#"
            [[rules]]
            id = "mention-spam"
            timeout = "10m"
            [rules.thresholds]
            mentions = 5
            window = "30s"

            [[rules]]
            id = "cross-post"
            duplicated = true
            timeout = "1h"
            [rules.thresholds]
            messages = 3
            channels = 2
            window = "1m"
        "#;

        let parsed: Rules = toml::from_str(raw).unwrap();
        assert_eq!(parsed.rules.len(), 2);

        let first = &parsed.rules[0];
        assert_eq!(first.id, "mention-spam");
        assert!(!first.require_duplicate_content);
        assert_eq!(first.thresholds.min_mentions, 5);
        assert_eq!(first.thresholds.min_messages, 0);
        assert_eq!(first.thresholds.window, Duration::seconds(30));
        assert_eq!(first.timeout, Duration::minutes(10));

        let second = &parsed.rules[1];
        assert!(second.require_duplicate_content);
        assert_eq!(second.thresholds.min_messages, 3);
        assert_eq!(second.thresholds.min_distinct_channels, 2);
        assert!(second.thresholds.any_configured());
    }

    #[test]
    fn bad_duration_is_a_parse_failure() {
        let raw = r#"
            [[rules]]
            id = "broken"
            timeout = "forever"
            [rules.thresholds]
            messages = 2
            window = "1m"
        "#;
        assert!(toml::from_str::<Rules>(raw).is_err());
    }
}
