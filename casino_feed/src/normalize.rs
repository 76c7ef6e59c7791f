//! Raw feed rows → canonical leaderboard entries.
//!
//! Normalization never fails and never drops a row. Each field is resolved
//! through an ordered alias list and falls back to a deterministic default:
//!
//! | field              | aliases                                    | fallback               |
//! |--------------------|--------------------------------------------|------------------------|
//! | `casino_player_id` | `user_id`, `userId`, `id`                  | `unknown-{ordinal}`    |
//! | `wager_amount`     | `wagered_amount`, `wageredAmount`, `wager` | `0`                    |
//! | `rank`             | `rank`                                     | `ordinal + 1`          |
//! | `timestamp`        | `timestamp`, `date`                        | ingestion wall clock   |
//!
//! A malformed wager degrades to zero instead of dropping the row, so row count
//! and rank continuity survive one partner's bad data.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::models::{casino::CasinoId, entry::NormalizedEntry, raw_row::RawRow};

/// Column names tried, in order, for the player identity.
pub const PLAYER_ID_ALIASES: &[&str] = &["user_id", "userId", "id"];
/// Column names tried, in order, for the wagered amount.
pub const WAGER_ALIASES: &[&str] = &["wagered_amount", "wageredAmount", "wager"];
/// Column names tried, in order, for the rank.
pub const RANK_ALIASES: &[&str] = &["rank"];
/// Column names tried, in order, for the row's point in time.
pub const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "date"];

/// Normalizes one row. `ordinal` is the row's 0-based position in its feed and
/// `now` is the ingestion wall clock used when the row carries no usable time.
pub fn normalize_row(
    casino: CasinoId,
    row: RawRow,
    ordinal: usize,
    now: DateTime<Utc>,
) -> NormalizedEntry {
    let casino_player_id = row
        .first_present(PLAYER_ID_ALIASES)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown-{ordinal}"));

    let wager_amount = row
        .first_present(WAGER_ALIASES)
        .and_then(parse_wager)
        .unwrap_or(0.0);

    let rank = row
        .first_present(RANK_ALIASES)
        .and_then(parse_rank)
        .unwrap_or_else(|| default_rank(ordinal));

    let timestamp = row
        .first_present(TIMESTAMP_ALIASES)
        .and_then(parse_timestamp)
        .unwrap_or(now);

    NormalizedEntry {
        casino_player_id,
        casino: casino.as_str().to_string(),
        wager_amount,
        rank,
        timestamp,
        data: row,
    }
}

/// Normalizes a whole feed, assigning ordinals by position.
pub fn normalize_rows(
    casino: CasinoId,
    rows: Vec<RawRow>,
    now: DateTime<Utc>,
) -> Vec<NormalizedEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(ordinal, row)| normalize_row(casino, row, ordinal, now))
        .collect()
}

fn default_rank(ordinal: usize) -> i32 {
    i32::try_from(ordinal.saturating_add(1)).unwrap_or(i32::MAX)
}

/// Parses the longest leading decimal number (`"1000 USD"` → 1000).
/// Negative and non-finite amounts are rejected.
fn parse_wager(raw: &str) -> Option<f64> {
    let prefix = numeric_prefix(raw, true);
    let value: f64 = prefix.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Parses the longest leading integer (`"2.0"` → 2). Ranks below 1 are rejected.
fn parse_rank(raw: &str) -> Option<i32> {
    let prefix = numeric_prefix(raw, false);
    let value: i32 = prefix.parse().ok()?;
    (value >= 1).then_some(value)
}

/// Returns the leading `[+-]digits[.digits][e[+-]digits]` slice of `raw`
/// (fraction and exponent only when `decimal`).
fn numeric_prefix(raw: &str, decimal: bool) -> &str {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut has_digits = end > digits_start;

    if decimal {
        if bytes.get(end) == Some(&b'.') {
            let frac_start = end + 1;
            let mut frac_end = frac_start;
            while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
                frac_end += 1;
            }
            if has_digits || frac_end > frac_start {
                end = frac_end;
                has_digits = true;
            }
        }
        if has_digits && matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exp_end = end + 1;
            if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
                exp_end += 1;
            }
            let exp_digits = exp_end;
            while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
                exp_end += 1;
            }
            if exp_end > exp_digits {
                end = exp_end;
            }
        }
    }

    if has_digits { &s[..end] } else { "" }
}

/// Accepts RFC-3339, `YYYY-MM-DD[ T]HH:MM:SS` (UTC), `YYYY-MM-DD` (UTC midnight)
/// and integer unix seconds.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
    }
    None
}
