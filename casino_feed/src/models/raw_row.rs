//! Generic adapter output: one upstream row as an ordered string map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single row of a partner feed, keyed by the partner's own column names.
///
/// No key set is guaranteed across partners; the normalizer resolves fields
/// through alias lists. Column order is preserved so the row can be stored
/// verbatim as an audit payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(IndexMap<String, String>);

impl RawRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value for the same column.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the raw value of a column, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the first non-empty value among `aliases`, in order.
    ///
    /// Empty strings count as absent, so `user_id=""` falls through to `userId`.
    pub fn first_present(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|k| self.get(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates columns in feed order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
