// File: src/config.rs

use std::collections::HashSet;
use std::path::Path;

use chrono::Duration;
use serde::Deserialize;
use tracing::warn;

use pulsar_common::models::HeuristicRule;

use crate::Error;

/// Environment variable consulted when the config file carries no token.
pub const TOKEN_ENV_VAR: &str = "DISCORD_TOKEN";

fn default_cache_size() -> usize {
    500
}

fn default_request_timeout() -> Duration {
    Duration::seconds(10)
}

fn default_account_age() -> Duration {
    Duration::zero()
}

/// Longest member timeout Discord accepts.
pub const MAX_RULE_TIMEOUT_DAYS: i64 = 28;

/// Discord IDs are non-zero unsigned 64-bit snowflakes.
fn validate_id(field: &str, raw: &str) -> Result<(), Error> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(()),
        _ => Err(Error::Config(format!("{field} is not a Discord ID: '{raw}'"))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AntiSpamSettings {
    #[serde(default)]
    pub enabled: bool,

    /// How many recent messages (across all authors) are kept for evaluation.
    #[serde(default = "default_cache_size")]
    pub message_cache_size: usize,

    /// Members holding any of these roles are never evaluated.
    #[serde(default)]
    pub excluded_role_ids: Vec<String>,

    /// Members whose account was created at most this long before they
    /// joined are reported. Zero turns the check off.
    #[serde(
        default = "default_account_age",
        deserialize_with = "pulsar_common::duration::deserialize"
    )]
    pub minimum_account_age: Duration,

    /// Evaluated in order; the first matching rule wins.
    #[serde(default)]
    pub rules: Vec<HeuristicRule>,
}

impl Default for AntiSpamSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            message_cache_size: default_cache_size(),
            excluded_role_ids: Vec::new(),
            minimum_account_age: default_account_age(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub discord_token: Option<String>,

    /// Where anti-spam alerts and deletion logs go.
    pub log_channel_id: String,

    /// Deadline applied to every call against the Discord API.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "pulsar_common::duration::deserialize"
    )]
    pub request_timeout: Duration,

    #[serde(default)]
    pub antispam: AntiSpamSettings,
}

impl Settings {
    /// Read, parse and validate a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, Error> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject anything that would leave the bot running on a partial or
    /// nonsensical ruleset.
    pub fn validate(&self) -> Result<(), Error> {
        if self.log_channel_id.trim().is_empty() {
            return Err(Error::Config("log_channel_id must be set".into()));
        }
        validate_id("log_channel_id", &self.log_channel_id)?;
        if self.request_timeout <= Duration::zero() {
            return Err(Error::Config("request_timeout must be positive".into()));
        }

        let antispam = &self.antispam;
        if antispam.message_cache_size == 0 {
            return Err(Error::Config("antispam.message_cache_size must be non-zero".into()));
        }

        for role_id in &antispam.excluded_role_ids {
            validate_id("antispam.excluded_role_ids entry", role_id)?;
        }

        let mut seen = HashSet::new();
        for (idx, rule) in antispam.rules.iter().enumerate() {
            if rule.id.trim().is_empty() {
                return Err(Error::Config(format!("antispam rule #{idx} has an empty id")));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(Error::Config(format!("duplicate antispam rule id '{}'", rule.id)));
            }
            if rule.thresholds.window <= Duration::zero() {
                return Err(Error::Config(format!("rule '{}': window must be positive", rule.id)));
            }
            if rule.timeout <= Duration::zero() {
                return Err(Error::Config(format!("rule '{}': timeout must be positive", rule.id)));
            }
            if rule.timeout > Duration::days(MAX_RULE_TIMEOUT_DAYS) {
                return Err(Error::Config(format!(
                    "rule '{}': timeout exceeds Discord's {MAX_RULE_TIMEOUT_DAYS} day limit",
                    rule.id
                )));
            }
            if !rule.thresholds.any_configured() {
                return Err(Error::Config(format!(
                    "rule '{}' sets no messages/channels/mentions threshold and would flag every message",
                    rule.id
                )));
            }
        }

        if antispam.enabled && antispam.rules.is_empty() {
            warn!("Anti-spam is enabled but no rules are configured");
        }

        Ok(())
    }

    /// Token from the file, falling back to `env_token` (normally the value
    /// of `DISCORD_TOKEN`).
    pub fn resolve_token(&self, env_token: Option<String>) -> Result<String, Error> {
        let non_empty = |t: &String| !t.trim().is_empty();
        self.discord_token
            .clone()
            .filter(non_empty)
            .or_else(|| env_token.filter(non_empty))
            .ok_or_else(|| {
                Error::Config(format!("no Discord token in config file or {TOKEN_ENV_VAR}"))
            })
    }

    pub fn request_timeout_std(&self) -> std::time::Duration {
        self.request_timeout
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        log_channel_id = "900"
        request_timeout = "5s"

        [antispam]
        enabled = true
        message_cache_size = 3
        excluded_role_ids = ["42"]
        minimum_account_age = "1d"

        [[antispam.rules]]
        id = "mentions"
        timeout = "10m"
        [antispam.rules.thresholds]
        mentions = 5
        window = "30s"

        [[antispam.rules]]
        id = "crosspost"
        duplicated = true
        timeout = "1h"
        [antispam.rules.thresholds]
        messages = 3
        channels = 2
        window = "1m"
    "#;

    #[test]
    fn sample_settings_load() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        assert_eq!(settings.log_channel_id, "900");
        assert_eq!(settings.request_timeout, Duration::seconds(5));
        assert!(settings.antispam.enabled);
        assert_eq!(settings.antispam.message_cache_size, 3);
        assert_eq!(settings.antispam.excluded_role_ids, vec!["42".to_string()]);
        assert_eq!(settings.antispam.minimum_account_age, Duration::days(1));
        let ids: Vec<&str> = settings.antispam.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["mentions", "crosspost"]);
    }

    #[test]
    fn defaults_apply_when_sections_are_missing() {
        let settings = Settings::from_toml(r#"log_channel_id = "1""#).unwrap();
        assert!(!settings.antispam.enabled);
        assert_eq!(settings.antispam.message_cache_size, 500);
        assert_eq!(settings.request_timeout, Duration::seconds(10));
        assert_eq!(settings.antispam.minimum_account_age, Duration::zero());
        assert!(settings.antispam.rules.is_empty());
    }

    #[test]
    fn zero_cache_size_is_fatal() {
        let raw = SAMPLE.replace("message_cache_size = 3", "message_cache_size = 0");
        assert!(matches!(Settings::from_toml(&raw), Err(Error::Config(_))));
    }

    #[test]
    fn duplicate_rule_ids_are_fatal() {
        let raw = SAMPLE.replace(r#"id = "crosspost""#, r#"id = "mentions""#);
        assert!(matches!(Settings::from_toml(&raw), Err(Error::Config(_))));
    }

    #[test]
    fn rule_without_thresholds_is_fatal() {
        let raw = SAMPLE.replace("mentions = 5", "mentions = 0");
        assert!(matches!(Settings::from_toml(&raw), Err(Error::Config(_))));
    }

    #[test]
    fn zero_window_is_fatal() {
        let raw = SAMPLE.replace(r#"window = "30s""#, r#"window = "0""#);
        assert!(matches!(Settings::from_toml(&raw), Err(Error::Config(_))));
    }

    #[test]
    fn ids_that_discord_would_reject_are_fatal() {
        for bad in ["general", "0", "000000000000000000", "-5", "99999999999999999999"] {
            let raw = SAMPLE.replace(r#"log_channel_id = "900""#, &format!(r#"log_channel_id = "{bad}""#));
            assert!(
                matches!(Settings::from_toml(&raw), Err(Error::Config(_))),
                "log_channel_id {bad} was accepted"
            );
        }

        let raw = SAMPLE.replace(r#"excluded_role_ids = ["42"]"#, r#"excluded_role_ids = ["42", "mods"]"#);
        assert!(matches!(Settings::from_toml(&raw), Err(Error::Config(_))));
    }

    #[test]
    fn timeout_over_discord_limit_is_fatal() {
        let raw = SAMPLE.replace(r#"timeout = "1h""#, r#"timeout = "29d""#);
        assert!(matches!(Settings::from_toml(&raw), Err(Error::Config(_))));

        let raw = SAMPLE.replace(r#"timeout = "1h""#, r#"timeout = "28d""#);
        assert!(Settings::from_toml(&raw).is_ok());
    }

    #[test]
    fn malformed_toml_is_fatal() {
        assert!(matches!(
            Settings::from_toml("log_channel_id = "),
            Err(Error::Toml(_))
        ));
        let raw = SAMPLE.replace(r#"timeout = "10m""#, r#"timeout = "ten minutes""#);
        assert!(matches!(Settings::from_toml(&raw), Err(Error::Toml(_))));
    }

    #[test]
    fn token_prefers_file_then_env() {
        let mut settings = Settings::from_toml(SAMPLE).unwrap();
        assert!(settings.resolve_token(None).is_err());
        assert_eq!(settings.resolve_token(Some("env".into())).unwrap(), "env");

        settings.discord_token = Some("file".into());
        assert_eq!(settings.resolve_token(Some("env".into())).unwrap(), "file");
    }
}
