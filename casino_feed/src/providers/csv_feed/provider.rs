use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use secrecy::ExposeSecret;
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    models::{feed_config::FeedConfig, raw_row::RawRow},
    providers::{
        FeedProvider, FetchSnafu, InitSnafu, ProviderError, StatusSnafu, csv_feed::parse::parse_csv,
    },
};

/// Upper bound on a single feed request, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body kept in [`ProviderError::Status`].
const BODY_EXCERPT_CHARS: usize = 256;

/// Fetches a partner's leaderboard as a CSV export.
pub struct CsvFeedProvider {
    client: Client,
}

impl CsvFeedProvider {
    /// Creates a provider with the [`DEFAULT_TIMEOUT`].
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a provider whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("text/csv"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context(InitSnafu)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedProvider for CsvFeedProvider {
    async fn fetch_rows(&self, config: &FeedConfig) -> Result<Vec<RawRow>, ProviderError> {
        let url = config.url();
        info!(url, "fetching tabular leaderboard feed");

        let mut request = self.client.get(url);
        if let Some(key) = config.api_key() {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.context(FetchSnafu { url })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return StatusSnafu {
                url,
                status: status.as_u16(),
                body: excerpt(&body),
            }
            .fail();
        }

        let payload = response.bytes().await.context(FetchSnafu { url })?;
        let rows = parse_csv(&payload)?;

        debug!(url, rows = rows.len(), "parsed tabular leaderboard feed");
        Ok(rows)
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
