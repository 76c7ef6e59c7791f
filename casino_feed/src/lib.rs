//! Partner leaderboard feeds.
//!
//! This crate owns the edge of the ingestion pipeline:
//! - [`providers`]: the [`FeedProvider`](providers::FeedProvider) contract and the tabular
//!   (CSV) reference adapter that pulls a partner's raw feed into [`RawRow`](models::raw_row::RawRow)s.
//! - [`normalize`]: the lenient mapping from raw rows into canonical
//!   [`NormalizedEntry`](models::entry::NormalizedEntry) records.
//!
//! Nothing in here touches storage; callers decide what to do with the entries.

pub mod models;
pub mod normalize;
pub mod providers;
