use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::raw_row::RawRow;

/// Canonical leaderboard row produced by the normalizer.
///
/// This is a leaderboard entry without its owning tenant; the ingestion layer
/// attaches the tenant before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEntry {
    /// Player identity as assigned by the casino (or a synthetic `unknown-{n}`).
    pub casino_player_id: String,
    /// Canonical casino tag (e.g. "stake").
    pub casino: String,
    /// Amount wagered; never negative.
    pub wager_amount: f64,
    /// 1-based position on the leaderboard.
    pub rank: i32,
    /// Point in time the row represents (UTC).
    pub timestamp: DateTime<Utc>,
    /// The untouched upstream row.
    pub data: RawRow,
}
