//! Tabular (CSV) partner feed adapter.
//!
//! The reference integration: a partner exposes its leaderboard as a CSV export
//! with a header row. [`provider::CsvFeedProvider`] handles transport and
//! [`parse::parse_csv`] turns the payload into [`RawRow`](crate::models::raw_row::RawRow)s.

pub mod parse;
pub mod provider;

pub use parse::parse_csv;
pub use provider::CsvFeedProvider;
