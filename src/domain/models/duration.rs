//! Human-readable durations in configuration (`500ms`, `30s`, `5m`, `1h30m`).
//!
//! Use with `#[serde(with = "crate::domain::models::duration")]`.

use serde::{de, Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Parse a duration string. A bare number is read as seconds.
pub fn parse(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Duration::ZERO);
    }
    if let Ok(secs) = input.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration `{input}`: {e}"));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration `{input}`"))?;
        if digits == 0 {
            return Err(format!("invalid duration `{input}`"));
        }
        let value: f64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid number in duration `{input}`"))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            unit => return Err(format!("unknown unit `{unit}` in duration `{input}`")),
        };
        rest = &rest[unit_len..];
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (value * nanos_per_unit).round() as u64;
        total += Duration::from_nanos(nanos);
    }
    Ok(total)
}

/// Format a duration in the shortest unit that keeps it exact.
pub fn format(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 != 0 || millis == 0 {
        format!("{millis}ms")
    } else if millis % 3_600_000 == 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else {
        format!("{}s", millis / 1000)
    }
}

/// Serde deserializer accepting duration strings or plain seconds.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(de::Error::custom)
}

/// Serde serializer producing the [`format`] representation.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(*duration))
}
