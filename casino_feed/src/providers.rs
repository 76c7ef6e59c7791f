//! Provider abstraction for partner leaderboard feeds.
//!
//! This module defines the [`FeedProvider`] trait, the single interface every
//! casino integration implements: given one tenant's [`FeedConfig`], fetch the
//! partner's feed and hand back its rows as generic [`RawRow`]s.
//!
//! Each concrete provider (today only the tabular [`csv_feed`] adapter) owns its
//! transport and wire format. Providers do not retry; retry policy belongs to
//! whoever drives them.
//!
//! The trait is designed for async usage and supports dynamic dispatch
//! (`dyn FeedProvider`) so callers can pick an adapter at runtime from a tenant's
//! casino tag.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use casino_feed::models::{feed_config::FeedConfig, raw_row::RawRow};
//! use casino_feed::providers::{FeedProvider, ProviderError};
//!
//! struct StaticFeed;
//!
//! #[async_trait]
//! impl FeedProvider for StaticFeed {
//!     async fn fetch_rows(&self, _config: &FeedConfig) -> Result<Vec<RawRow>, ProviderError> {
//!         Ok(vec![[("user_id", "u1"), ("rank", "1")].into_iter().collect()])
//!     }
//! }
//! ```

pub mod csv_feed;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{feed_config::FeedConfig, raw_row::RawRow};

/// Trait for fetching one partner's raw leaderboard feed.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Fetches and parses the feed described by `config`.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<RawRow>)` - rows in feed order (possibly empty).
    /// * `Err(ProviderError)` - configuration, transport, status or parse failure.
    async fn fetch_rows(&self, config: &FeedConfig) -> Result<Vec<RawRow>, ProviderError>;
}

/// Errors that can occur within a [`FeedProvider`] implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// Required per-tenant configuration is missing or malformed.
    #[snafu(display("Configuration error: {message}"))]
    Configuration {
        message: String,
        backtrace: Backtrace,
    },

    /// The upstream could not be reached (DNS, connect, timeout, body read).
    #[snafu(display("Fetch from {url} failed: {source}"))]
    Fetch {
        url: String,
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The upstream answered with a non-success status.
    #[snafu(display("Fetch from {url} returned HTTP {status}: {body}"))]
    Status {
        url: String,
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The payload could not be parsed in the provider's expected format.
    #[snafu(display("Parse error: {message}"))]
    Parse {
        message: String,
        backtrace: Backtrace,
    },

    /// Failed to build the HTTP client.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    Init {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

impl ProviderError {
    /// `true` for transport and upstream-status failures, the only kind a caller
    /// may reasonably retry.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, ProviderError::Fetch { .. } | ProviderError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::casino::CasinoId;

    struct CsvLike;
    struct Broken;

    #[async_trait]
    impl FeedProvider for CsvLike {
        async fn fetch_rows(&self, config: &FeedConfig) -> Result<Vec<RawRow>, ProviderError> {
            Ok(vec![[("source", config.url())].into_iter().collect()])
        }
    }

    #[async_trait]
    impl FeedProvider for Broken {
        async fn fetch_rows(&self, config: &FeedConfig) -> Result<Vec<RawRow>, ProviderError> {
            StatusSnafu {
                url: config.url(),
                status: 502u16,
                body: "bad gateway",
            }
            .fail()
        }
    }

    // Picked at runtime from a casino tag, which only works through `dyn FeedProvider`.
    fn provider_for(tag: &str) -> Box<dyn FeedProvider> {
        match CasinoId::from_tag(tag) {
            Some(CasinoId::Stake) => Box::new(CsvLike),
            None => Box::new(Broken),
        }
    }

    #[tokio::test]
    async fn dynamic_dispatch_by_casino_tag() {
        let cfg = FeedConfig::new("https://example.com/feed.csv", None).unwrap();

        let rows = provider_for("Stake").fetch_rows(&cfg).await.unwrap();
        assert_eq!(rows[0].get("source"), Some("https://example.com/feed.csv"));

        let err = provider_for("other").fetch_rows(&cfg).await.unwrap_err();
        assert!(err.is_fetch_failure());
        assert_eq!(
            err.to_string(),
            "Fetch from https://example.com/feed.csv returned HTTP 502: bad gateway"
        );
    }

    #[test]
    fn only_transport_failures_are_retryable() {
        let parse = ParseSnafu { message: "nope" }.build();
        let config = ConfigurationSnafu { message: "nope" }.build();
        assert!(!parse.is_fetch_failure());
        assert!(!config.is_fetch_failure());
    }
}
