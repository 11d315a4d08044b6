//! Timestamp encodings accepted on waypoint markers.
//!
//! Every encoding normalizes to `f64` seconds. `Seconds` and `Mmss` are
//! offsets into the video; `Iso8601` is seconds since the Unix epoch.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// How marker timestamps are encoded on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// Anything convertible to a floating-point number of seconds.
    #[default]
    Seconds,
    /// Fixed-width `MMSS` string, minutes and seconds each `00`..=`59`.
    Mmss,
    /// RFC 3339 or `YYYY-MM-DD HH:MM:SS[.fff]` datetimes, taken as UTC.
    #[serde(rename = "iso")]
    Iso8601,
}

impl TimeFormat {
    /// Parse a form value such as `"mmss"`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "seconds" | "s" => Ok(Self::Seconds),
            "mmss" => Ok(Self::Mmss),
            "iso" | "iso8601" => Ok(Self::Iso8601),
            other => Err(Error::validation(format!("unknown time format '{other}'"))),
        }
    }

    /// Whether timestamps are absolute instants rather than video offsets.
    pub fn is_absolute(self) -> bool {
        matches!(self, Self::Iso8601)
    }

    /// Decode one raw timestamp into seconds.
    pub fn parse(self, raw: &Value) -> Result<f64> {
        match self {
            Self::Seconds => parse_seconds(raw),
            Self::Mmss => match raw {
                Value::String(s) => parse_mmss(s),
                other => Err(Error::validation(format!(
                    "MMSS timestamp must be a string, got {other}"
                ))),
            },
            Self::Iso8601 => match raw {
                Value::String(s) => parse_datetime(s).map(|dt| epoch_seconds(&dt)),
                other => Err(Error::validation(format!(
                    "ISO timestamp must be a string, got {other}"
                ))),
            },
        }
    }

    /// Encode seconds back into this format for the response body.
    pub fn render(self, seconds: f64) -> Value {
        match self {
            Self::Seconds => serde_json::json!(seconds),
            Self::Mmss => Value::String(format_mmss(seconds)),
            Self::Iso8601 => match from_epoch_seconds(seconds) {
                Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => serde_json::json!(seconds),
            },
        }
    }
}

fn parse_seconds(raw: &Value) -> Result<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::validation(format!("timestamp {raw} is not a number of seconds")))
}

/// Parse a fixed-width `MMSS` string into seconds.
pub fn parse_mmss(s: &str) -> Result<f64> {
    let bytes = s.as_bytes();
    if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(Error::validation(format!(
            "timestamp '{s}' is not in MMSS format"
        )));
    }
    let digits = |i: usize| u32::from(bytes[i] - b'0') * 10 + u32::from(bytes[i + 1] - b'0');
    let (minutes, seconds) = (digits(0), digits(2));
    if minutes > 59 || seconds > 59 {
        return Err(Error::validation(format!(
            "timestamp '{s}' has minutes or seconds out of range"
        )));
    }
    Ok(f64::from(minutes * 60 + seconds))
}

/// Render seconds as `MMSS`, rounding to the nearest whole second.
pub fn format_mmss(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}{:02}", total / 60, total % 60)
}

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Parse an RFC 3339 or naive (UTC) datetime.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::validation(format!("'{s}' is not a recognised datetime")))
}

pub fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mmss_round_trips_every_valid_value() {
        for m in 0..60 {
            for s in 0..60 {
                let text = format!("{m:02}{s:02}");
                assert_eq!(format_mmss(parse_mmss(&text).unwrap()), text);
            }
        }
    }

    #[test]
    fn mmss_rejects_malformed_strings() {
        for bad in ["", "123", "12345", "12a4", "6000", "0060", " 0130"] {
            assert!(matches!(parse_mmss(bad), Err(Error::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn seconds_accept_numbers_and_numeric_strings() {
        assert_eq!(TimeFormat::Seconds.parse(&json!(12.5)).unwrap(), 12.5);
        assert_eq!(TimeFormat::Seconds.parse(&json!(" 10 ")).unwrap(), 10.0);
        assert!(TimeFormat::Seconds.parse(&json!("ten")).is_err());
        assert!(TimeFormat::Seconds.parse(&json!(null)).is_err());
    }

    #[test]
    fn mmss_requires_a_string() {
        assert_eq!(TimeFormat::Mmss.parse(&json!("0130")).unwrap(), 90.0);
        assert!(TimeFormat::Mmss.parse(&json!(130)).is_err());
    }

    #[test]
    fn parses_drone_log_and_rfc3339_datetimes() {
        let a = parse_datetime("2024-03-01 10:00:05.500").unwrap();
        let b = parse_datetime("2024-03-01T10:00:05.5Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(parse_datetime("2024-03-01 10:00:05").unwrap().timestamp(), b.timestamp());
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn iso_renders_back_to_the_same_instant() {
        let secs = TimeFormat::Iso8601.parse(&json!("2024-03-01T10:00:05.250Z")).unwrap();
        assert_eq!(
            TimeFormat::Iso8601.render(secs),
            json!("2024-03-01T10:00:05.250Z")
        );
    }

    #[test]
    fn format_names() {
        assert_eq!(TimeFormat::from_name("MMSS").unwrap(), TimeFormat::Mmss);
        assert_eq!(TimeFormat::from_name("iso").unwrap(), TimeFormat::Iso8601);
        assert!(TimeFormat::from_name("hours").is_err());
    }
}
