// File: pulsar-common/src/duration.rs

use chrono::Duration;
use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// Parse a duration string such as "30s", "10m", "1h30m", "250ms" or "2d".
///
/// A bare "0" is accepted as zero. Units must be given for any other value.
pub fn parse_duration(s: &str) -> Result<Duration, Error> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::zero());
    }
    if s.is_empty() {
        return Err(Error::Parse("empty duration".into()));
    }

    let mut total = Duration::zero();
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| Error::Parse(format!("missing unit in duration '{s}'")))?;
        if digits == 0 {
            return Err(Error::Parse(format!("expected a number in duration '{s}'")));
        }
        let value: i64 = rest[..digits].parse()?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::try_milliseconds(value),
            "s" => Duration::try_seconds(value),
            "m" => Duration::try_minutes(value),
            "h" => Duration::try_hours(value),
            "d" => Duration::try_days(value),
            unit => {
                return Err(Error::Parse(format!("unknown unit '{unit}' in duration '{s}'")));
            }
        };
        total = part
            .and_then(|part| total.checked_add(&part))
            .ok_or_else(|| Error::Parse(format!("duration '{s}' is out of range")))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

/// Render a duration compactly, largest unit first ("1h30m", "45s", "0s").
pub fn format_duration(d: Duration) -> String {
    if d <= Duration::zero() {
        return "0s".to_string();
    }

    let mut out = String::new();
    let mut secs = d.num_seconds();
    let millis = d.num_milliseconds() % 1000;
    for (unit, size) in [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)] {
        let n = secs / size;
        if n > 0 {
            out.push_str(&format!("{n}{unit}"));
            secs -= n * size;
        }
    }
    if millis > 0 {
        out.push_str(&format!("{millis}ms"));
    }
    out
}

/// `deserialize_with` helper for duration strings in config files.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::minutes(10));
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("1d").unwrap(), Duration::days(1));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::milliseconds(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::zero());
    }

    #[test]
    fn parse_compound() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::minutes(90)
        );
        assert_eq!(
            parse_duration("1m0s").unwrap(),
            Duration::seconds(60)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("5y").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn format_round_trips_common_values() {
        assert_eq!(format_duration(Duration::hours(1)), "1h");
        assert_eq!(format_duration(Duration::minutes(90)), "1h30m");
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::zero()), "0s");
        assert_eq!(format_duration(Duration::milliseconds(1500)), "1s500ms");
    }
}
