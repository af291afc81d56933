//! Scripted provider for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ProviderError, StatsProvider};
use crate::models::{PlayerBundle, Shard};

/// Provider that answers from a fixed script.
///
/// Unscripted players are `NotFound`. Every call is counted, including failures.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<HashMap<(Shard, String), Result<PlayerBundle, ProviderError>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(shard: Shard, nickname: &str) -> (Shard, String) {
        (shard, nickname.to_lowercase())
    }

    /// Script a successful lookup, keyed by the bundle's shard and nickname.
    pub fn with_player(self, bundle: PlayerBundle) -> Self {
        self.set_player(bundle);
        self
    }

    /// Script a failing lookup.
    pub fn with_error(self, shard: Shard, nickname: &str, error: ProviderError) -> Self {
        self.set_error(shard, nickname, error);
        self
    }

    pub fn set_player(&self, bundle: PlayerBundle) {
        let key = Self::key(bundle.profile.shard, &bundle.profile.nickname);
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(key, Ok(bundle));
        }
    }

    pub fn set_error(&self, shard: Shard, nickname: &str, error: ProviderError) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(Self::key(shard, nickname), Err(error));
        }
    }

    /// Number of `fetch_player` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_player(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<PlayerBundle, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let responses = self
            .responses
            .lock()
            .map_err(|_| ProviderError::Upstream("mock script poisoned".to_string()))?;
        responses
            .get(&Self::key(shard, nickname))
            .cloned()
            .unwrap_or(Err(ProviderError::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_script() {
        let provider = MockProvider::new()
            .with_player(PlayerBundle::new(Shard::Steam, "Scripted".to_string()))
            .with_error(
                Shard::Steam,
                "limited",
                ProviderError::RateLimited {
                    retry_after_secs: 5,
                },
            );

        let bundle = provider.fetch_player(Shard::Steam, "scripted").await.unwrap();
        assert_eq!(bundle.profile.nickname, "Scripted");

        assert_eq!(
            provider.fetch_player(Shard::Steam, "limited").await,
            Err(ProviderError::RateLimited {
                retry_after_secs: 5
            })
        );
        assert_eq!(
            provider.fetch_player(Shard::Kakao, "scripted").await,
            Err(ProviderError::NotFound)
        );
        assert_eq!(provider.calls(), 3);
    }
}
