//! Timestamp text encoding for the database.
//!
//! Every timestamp column holds an RFC-3339 UTC string with millisecond
//! precision (`2023-01-01T00:00:00.000Z`). The fixed width matters: the entry
//! uniqueness key includes the timestamp, so one instant must always encode to
//! the same text no matter how the upstream spelled it.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC datetime as an RFC-3339 string with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// RFC-3339 with any offset -> UTC.
pub fn parse_ts_to_utc(s: &str) -> chrono::ParseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn equal_instants_encode_identically() {
        let a = parse_ts_to_utc("2023-01-01T02:00:00+02:00").unwrap();
        let b = parse_ts_to_utc("2023-01-01T00:00:00.000Z").unwrap();
        assert_eq!(to_rfc3339_millis(a), to_rfc3339_millis(b));
        assert_eq!(to_rfc3339_millis(a), "2023-01-01T00:00:00.000Z");
    }

    #[test]
    fn sub_millisecond_precision_is_truncated() {
        let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(to_rfc3339_millis(dt), "2023-11-14T22:13:20.123Z");
        assert!(parse_ts_to_utc("yesterday").is_err());
    }
}
