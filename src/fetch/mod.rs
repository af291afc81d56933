//! HTTP fetching for JSON:API endpoints.
//!
//! A thin wrapper over `reqwest` that sets the auth and accept headers,
//! enforces a response size limit, and maps HTTP statuses onto typed errors.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Media type used by the stats API.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Maximum response size (default 10MB; match documents are large)
    pub max_content_size: usize,

    /// Bearer token; requests go out unauthenticated when absent
    pub api_key: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("clan-tracker/", env!("CARGO_PKG_VERSION")).to_string(),
            max_content_size: 10 * 1024 * 1024,
            api_key: None,
        }
    }
}

/// JSON:API fetcher.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("clan-tracker")),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_API_MEDIA_TYPE));

        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| FetchError::InvalidHeader(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a fetcher with default configuration.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// GET a URL and parse the body as JSON.
    pub async fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        debug!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok());
            let err = classify_status(url, status, retry_after);
            if matches!(err, FetchError::RateLimited { .. }) {
                warn!("{}", err);
            }
            return Err(err);
        }

        let content = response.bytes().await?;

        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        Ok(serde_json::from_slice(&content)?)
    }
}

/// Map a non-success status onto a fetch error.
pub fn classify_status(url: &Url, status: StatusCode, retry_after: Option<u64>) -> FetchError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited {
            host: url.host_str().unwrap_or("unknown").to_string(),
            retry_after_secs: retry_after.unwrap_or(60),
        },
        StatusCode::NOT_FOUND => FetchError::NotFound(url.path().to_string()),
        _ => FetchError::HttpStatus {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://api.pubg.com/shards/steam/players").unwrap()
    }

    #[test]
    fn test_classify_rate_limited() {
        match classify_status(&url(), StatusCode::TOO_MANY_REQUESTS, Some(12)) {
            FetchError::RateLimited {
                host,
                retry_after_secs,
            } => {
                assert_eq!(host, "api.pubg.com");
                assert_eq!(retry_after_secs, 12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_rate_limited_default_retry() {
        assert!(matches!(
            classify_status(&url(), StatusCode::TOO_MANY_REQUESTS, None),
            FetchError::RateLimited {
                retry_after_secs: 60,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_not_found() {
        match classify_status(&url(), StatusCode::NOT_FOUND, None) {
            FetchError::NotFound(path) => assert_eq!(path, "/shards/steam/players"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_other_status() {
        assert!(matches!(
            classify_status(&url(), StatusCode::UNAUTHORIZED, None),
            FetchError::HttpStatus { status: 401, .. }
        ));
    }

    #[test]
    fn test_fetcher_config_default() {
        let config = FetcherConfig::default();

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("clan-tracker/"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_fetcher_builds_with_key() {
        let config = FetcherConfig {
            api_key: Some("secret-token".to_string()),
            ..FetcherConfig::default()
        };
        assert!(Fetcher::new(config).is_ok());
    }

    #[test]
    fn test_fetcher_rejects_bad_key() {
        let config = FetcherConfig {
            api_key: Some("bad\nkey".to_string()),
            ..FetcherConfig::default()
        };
        assert!(matches!(
            Fetcher::new(config),
            Err(FetchError::InvalidHeader(_))
        ));
    }
}
