//! External stats provider.
//!
//! A provider turns a (shard, nickname) lookup into a normalized
//! [`PlayerBundle`](crate::models::PlayerBundle). Upstream field-name drift is
//! absorbed once, in [`normalize`]; nothing downstream looks at raw fields.

pub mod mock;
pub mod normalize;
pub mod pubg;

pub use mock::MockProvider;
pub use pubg::{PubgClient, PubgConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::models::{PlayerBundle, Shard};

/// Failures a provider reports to the source selector.
///
/// The selector treats every variant the same way (fall back to cache, or not
/// found); the distinction is kept for logging.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("player not found")]
    NotFound,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<FetchError> for ProviderError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(_) => ProviderError::NotFound,
            FetchError::RateLimited {
                retry_after_secs, ..
            } => ProviderError::RateLimited { retry_after_secs },
            other => ProviderError::Upstream(other.to_string()),
        }
    }
}

/// Trait for stats providers.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Fetch and normalize everything known about a player.
    async fn fetch_player(&self, shard: Shard, nickname: &str)
        -> Result<PlayerBundle, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_mapping() {
        assert_eq!(
            ProviderError::from(FetchError::NotFound("/players".to_string())),
            ProviderError::NotFound
        );
        assert_eq!(
            ProviderError::from(FetchError::RateLimited {
                host: "api.pubg.com".to_string(),
                retry_after_secs: 30,
            }),
            ProviderError::RateLimited {
                retry_after_secs: 30
            }
        );
        assert!(matches!(
            ProviderError::from(FetchError::HttpStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            }),
            ProviderError::Upstream(_)
        ));
    }
}
