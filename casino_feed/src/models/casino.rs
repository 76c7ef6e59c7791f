//! Casino identifiers known to the feed layer.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which upstream casino a tenant mirrors (serde snake_case).
///
/// Tenants carry the casino as a free-form tag; [`CasinoId::from_tag`] is the
/// single place that maps those tags onto the adapters this crate ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasinoId {
    /// Stake.com, served as a tabular CSV export.
    Stake,
}

/// The tag did not match any casino with a registered adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported casino: {0}")]
pub struct UnknownCasinoError(pub String);

impl CasinoId {
    /// Every casino this crate knows how to ingest.
    pub const ALL: [CasinoId; 1] = [CasinoId::Stake];

    /// Canonical lowercase tag, as stored alongside entries.
    pub fn as_str(self) -> &'static str {
        match self {
            CasinoId::Stake => "stake",
        }
    }

    /// Case-insensitive, whitespace-tolerant lookup of a tenant's casino tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(tag))
    }
}

impl FromStr for CasinoId {
    type Err = UnknownCasinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| UnknownCasinoError(s.trim().to_string()))
    }
}

impl fmt::Display for CasinoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
