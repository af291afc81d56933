//! Source selection.
//!
//! Per lookup, decides which tier(s) answer:
//!
//! | cached | live ok | result                                   | background  |
//! |--------|---------|------------------------------------------|-------------|
//! | yes    | yes     | merge, `db_with_api_enhancement`         | reconcile   |
//! | yes    | no      | cache projection, `database`             | none        |
//! | no     | yes     | live bundle, `pubg_api_only`             | provision   |
//! | no     | no      | not found                                | none        |
//!
//! The request never waits on a cache write.

mod merge;

pub use merge::*;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::{is_valid_nickname, ClanMember, DataSource, PlayerBundle, ResolvedBundle, Shard};
use crate::provider::StatsProvider;
use crate::storage::{CacheStore, StorageError};
use crate::sync::BackgroundTasks;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("player {nickname} not found on {shard}")]
    NotFound { shard: Shard, nickname: String },

    #[error("invalid nickname: {0:?}")]
    InvalidNickname(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Request-path entry point.
#[derive(Clone)]
pub struct SourceSelector {
    store: Arc<dyn CacheStore>,
    provider: Arc<dyn StatsProvider>,
    tasks: BackgroundTasks,
}

impl SourceSelector {
    pub fn new(
        store: Arc<dyn CacheStore>,
        provider: Arc<dyn StatsProvider>,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            store,
            provider,
            tasks,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Resolve a lookup.
    pub async fn resolve(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<ResolvedBundle, ResolveError> {
        let span = lookup_span("resolve", shard, nickname);
        self.resolve_inner(shard, nickname).instrument(span).await
    }

    /// Explicit live refresh: no merge, tagged `pubg_api`. Falls back like a
    /// lookup when the provider fails.
    pub async fn refresh(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<ResolvedBundle, ResolveError> {
        let span = lookup_span("refresh", shard, nickname);
        self.refresh_inner(shard, nickname).instrument(span).await
    }

    async fn resolve_inner(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<ResolvedBundle, ResolveError> {
        validate(nickname)?;

        let cached = self.store.find_member(shard, nickname).await?;
        let live = self.provider.fetch_player(shard, nickname).await;

        match (cached, live) {
            (Some(member), Ok(bundle)) => {
                let view = self.cached_view(member).await?;
                let roster = self.roster_for(&bundle, Some(&view)).await?;
                self.tasks
                    .spawn_reconcile(view.member.id.clone(), bundle.clone());
                info!(source = %DataSource::Hybrid, "Resolved");
                Ok(merge(bundle, &view, roster))
            }
            (Some(member), Err(e)) => {
                warn!(provider = self.provider.name(), "Live fetch failed, serving cache: {}", e);
                let view = self.cached_view(member).await?;
                info!(source = %DataSource::CacheOnly, "Resolved");
                Ok(project_cache(&view))
            }
            (None, Ok(bundle)) => {
                let roster = self.roster_for(&bundle, None).await?;
                self.tasks.spawn_provision(bundle.clone());
                info!(source = %DataSource::ExternalOnly, "Resolved");
                Ok(from_live(bundle, roster, DataSource::ExternalOnly))
            }
            (None, Err(e)) => {
                info!(provider = self.provider.name(), "Not cached and live fetch failed: {}", e);
                Err(not_found(shard, nickname))
            }
        }
    }

    async fn refresh_inner(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<ResolvedBundle, ResolveError> {
        validate(nickname)?;

        let live = self.provider.fetch_player(shard, nickname).await;
        let cached = self.store.find_member(shard, nickname).await?;

        match (live, cached) {
            (Ok(bundle), Some(member)) => {
                let view = self.cached_view(member).await?;
                let roster = self.roster_for(&bundle, Some(&view)).await?;
                self.tasks
                    .spawn_reconcile(view.member.id.clone(), bundle.clone());
                Ok(from_live(bundle, roster, DataSource::Live))
            }
            (Ok(bundle), None) => {
                let roster = self.roster_for(&bundle, None).await?;
                self.tasks.spawn_provision(bundle.clone());
                Ok(from_live(bundle, roster, DataSource::Live))
            }
            (Err(e), Some(member)) => {
                warn!(provider = self.provider.name(), "Refresh failed, serving cache: {}", e);
                let view = self.cached_view(member).await?;
                Ok(project_cache(&view))
            }
            (Err(e), None) => {
                info!(provider = self.provider.name(), "Refresh failed: {}", e);
                Err(not_found(shard, nickname))
            }
        }
    }

    async fn cached_view(&self, member: ClanMember) -> Result<CachedView, StorageError> {
        let clan = self.store.clan(&member.clan_id).await?;
        let roster = match &clan {
            Some(clan) if !clan.is_unaffiliated() => self.store.clan_members(&clan.id).await?,
            _ => Vec::new(),
        };
        let matches = self.store.matches(&member.id).await?;
        let mode_stats = self.store.mode_stats(&member.id).await?;

        Ok(CachedView {
            member,
            clan,
            roster,
            matches,
            mode_stats,
        })
    }

    /// Clan members for the response. A live clan the cache knows by external
    /// id wins; otherwise the cached clan's roster is used.
    async fn roster_for(
        &self,
        bundle: &PlayerBundle,
        view: Option<&CachedView>,
    ) -> Result<Vec<ClanMember>, StorageError> {
        let live_external_id = bundle
            .profile
            .clan
            .as_ref()
            .and_then(|clan| clan.external_clan_id.as_deref());

        if let Some(external_id) = live_external_id {
            if let Some(clan) = self.store.find_clan_by_external_id(external_id).await? {
                return self.store.clan_members(&clan.id).await;
            }
        }

        Ok(view.map(|view| view.roster.clone()).unwrap_or_default())
    }
}

fn lookup_span(op: &'static str, shard: Shard, nickname: &str) -> tracing::Span {
    info_span!(
        "lookup",
        op,
        request_id = %Uuid::new_v4(),
        shard = %shard,
        nickname = %nickname
    )
}

fn validate(nickname: &str) -> Result<(), ResolveError> {
    if is_valid_nickname(nickname) {
        Ok(())
    } else {
        Err(ResolveError::InvalidNickname(nickname.to_string()))
    }
}

fn not_found(shard: Shard, nickname: &str) -> ResolveError {
    ResolveError::NotFound {
        shard,
        nickname: nickname.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Clan, ClanInfo, MatchCategory, MatchSummary};
    use crate::provider::{MockProvider, ProviderError};
    use crate::storage::{JsonlCacheStore, StorageConfig};
    use chrono::Utc;
    use tempfile::TempDir;

    struct Harness {
        _temp_dir: TempDir,
        store: Arc<dyn CacheStore>,
        provider: Arc<MockProvider>,
        selector: SourceSelector,
    }

    fn harness(provider: MockProvider) -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(
            JsonlCacheStore::open(StorageConfig::new(temp_dir.path().to_path_buf())).unwrap(),
        );
        let provider = Arc::new(provider);
        let tasks = BackgroundTasks::new(store.clone(), 4);
        let selector = SourceSelector::new(store.clone(), provider.clone(), tasks);
        Harness {
            _temp_dir: temp_dir,
            store,
            provider,
            selector,
        }
    }

    fn live(nickname: &str) -> PlayerBundle {
        let mut bundle = PlayerBundle::new(Shard::Steam, nickname.to_string());
        bundle.profile.account_id = Some(format!("account.{}", nickname.to_lowercase()));
        bundle.recent_matches = vec![MatchSummary {
            match_id: "m1".to_string(),
            mode: "squad".to_string(),
            map_name: "Erangel".to_string(),
            category: MatchCategory::Normal,
            placement: 1,
            kills: 5,
            assists: 1,
            damage: 500.0,
            survive_time: 1600.0,
            headshot_kills: 2,
            created_at: Utc::now(),
            teammates: Vec::new(),
        }];
        bundle.summary.total_matches = 1;
        bundle
    }

    #[tokio::test]
    async fn test_unknown_everywhere_is_not_found() {
        let h = harness(MockProvider::new());
        let err = h.selector.resolve(Shard::Steam, "nobody").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_nickname_skips_provider() {
        let h = harness(MockProvider::new());
        let err = h.selector.resolve(Shard::Steam, "bad name!").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidNickname(_)));
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_seen_is_external_only_then_hybrid() {
        let h = harness(MockProvider::new().with_player(live("Rookie")));

        let first = h.selector.resolve(Shard::Steam, "rookie").await.unwrap();
        assert_eq!(first.data_source, DataSource::ExternalOnly);
        h.selector.tasks().wait_idle().await;

        let second = h.selector.resolve(Shard::Steam, "rookie").await.unwrap();
        assert_eq!(second.data_source, DataSource::Hybrid);
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_cached_player_survives_provider_failure() {
        let h = harness(MockProvider::new().with_error(
            Shard::Steam,
            "veteran",
            ProviderError::Upstream("timeout".to_string()),
        ));
        let member = ClanMember::new(Shard::Steam, "Veteran".to_string(), Clan::unaffiliated_id());
        h.store.upsert_member(member).await.unwrap();

        let resolved = h.selector.resolve(Shard::Steam, "veteran").await.unwrap();
        assert_eq!(resolved.data_source, DataSource::CacheOnly);
        assert_eq!(resolved.ranked_summary.tier, "Unranked");
        assert_eq!(resolved.profile.nickname, "Veteran");
        assert_eq!(h.selector.tasks().pending(), 0);
    }

    #[tokio::test]
    async fn test_refresh_tags_live() {
        let h = harness(MockProvider::new().with_player(live("Fresh")));
        let resolved = h.selector.refresh(Shard::Steam, "fresh").await.unwrap();
        assert_eq!(resolved.data_source, DataSource::Live);
        h.selector.tasks().wait_idle().await;
        assert!(h
            .store
            .find_member(Shard::Steam, "fresh")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_refresh_falls_back_and_not_found() {
        let h = harness(MockProvider::new());
        assert!(matches!(
            h.selector.refresh(Shard::Steam, "missing").await,
            Err(ResolveError::NotFound { .. })
        ));

        h.store
            .upsert_member(ClanMember::new(Shard::Steam, "stored".to_string(), Clan::unaffiliated_id()))
            .await
            .unwrap();
        let resolved = h.selector.refresh(Shard::Steam, "stored").await.unwrap();
        assert_eq!(resolved.data_source, DataSource::CacheOnly);
    }

    #[tokio::test]
    async fn test_live_clan_roster_from_cache() {
        let mut bundle = live("Joiner");
        bundle.profile.clan = Some(ClanInfo {
            external_clan_id: Some("clan.k".to_string()),
            name: "Known".to_string(),
            tag: None,
            level: None,
            member_count: None,
        });
        let h = harness(MockProvider::new().with_player(bundle));

        let clan = Clan::new("clan.k".to_string(), "Known".to_string());
        h.store.insert_clan_if_absent(clan.clone()).await.unwrap();
        h.store
            .upsert_member(ClanMember::new(Shard::Steam, "Elder".to_string(), clan.id.clone()))
            .await
            .unwrap();

        let resolved = h.selector.resolve(Shard::Steam, "joiner").await.unwrap();
        assert_eq!(resolved.data_source, DataSource::ExternalOnly);
        assert_eq!(resolved.clan_members.len(), 1);
        assert_eq!(resolved.clan_members[0].nickname, "Elder");
    }
}
