//! Typed view over a tenant's opaque `apiConfig` blob.

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use snafu::OptionExt;

use crate::providers::{ConfigurationSnafu, ProviderError};

/// Connection settings for one tenant's upstream feed.
///
/// The URL is guaranteed non-empty; construct through [`FeedConfig::new`] or
/// [`FeedConfig::from_api_config`].
#[derive(Debug)]
pub struct FeedConfig {
    url: String,
    api_key: Option<SecretString>,
}

#[derive(Deserialize)]
struct RawFeedConfig {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "apiKey", alias = "api_key")]
    api_key: Option<String>,
}

impl FeedConfig {
    /// Builds a config from explicit parts. Blank API keys are treated as absent.
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self, ProviderError> {
        let url = url.trim();
        if url.is_empty() {
            return ConfigurationSnafu {
                message: "API URL not configured for tenant",
            }
            .fail();
        }
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::new(k.to_string().into()));
        Ok(Self {
            url: url.to_string(),
            api_key,
        })
    }

    /// Decodes the tenant's `apiConfig` JSON.
    ///
    /// Errors with [`ProviderError::Configuration`] when the blob is not an object,
    /// has mistyped fields, or lacks a non-empty `url`. Unknown keys are ignored.
    pub fn from_api_config(api_config: &Value) -> Result<Self, ProviderError> {
        if !api_config.is_object() {
            return ConfigurationSnafu {
                message: "apiConfig must be a JSON object",
            }
            .fail();
        }
        let raw: RawFeedConfig =
            serde_json::from_value(api_config.clone()).map_err(|e| {
                ConfigurationSnafu {
                    message: format!("invalid apiConfig: {e}"),
                }
                .build()
            })?;
        let url = raw.url.context(ConfigurationSnafu {
            message: "API URL not configured for tenant",
        })?;
        Self::new(&url, raw.api_key.as_deref())
    }

    /// Upstream feed URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Optional bearer token for the upstream.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn decodes_url_and_key_aliases() {
        let cfg = FeedConfig::from_api_config(&json!({
            "url": " https://example.com/lb.csv ",
            "apiKey": "k1",
            "extra": true,
        }))
        .unwrap();
        assert_eq!(cfg.url(), "https://example.com/lb.csv");
        assert_eq!(cfg.api_key().unwrap().expose_secret(), "k1");

        let cfg = FeedConfig::from_api_config(&json!({"url": "u", "api_key": "k2"})).unwrap();
        assert_eq!(cfg.api_key().unwrap().expose_secret(), "k2");
    }

    #[test]
    fn missing_or_blank_url_is_a_configuration_error() {
        for blob in [json!({}), json!({"url": "  "}), json!({"url": null}), json!("x")] {
            let err = FeedConfig::from_api_config(&blob).unwrap_err();
            assert!(
                matches!(err, ProviderError::Configuration { .. }),
                "{blob}: {err}"
            );
        }
    }

    #[test]
    fn blank_key_is_dropped_and_secret_is_redacted() {
        let cfg = FeedConfig::new("https://x", Some(" ")).unwrap();
        assert!(cfg.api_key().is_none());

        let cfg = FeedConfig::new("https://x", Some("hunter2")).unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
