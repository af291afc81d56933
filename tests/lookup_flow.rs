//! End-to-end lookups against the JSONL cache with a scripted provider.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use clan_tracker::models::{
    ClanInfo, DataSource, MatchCategory, MatchSummary, PlayerBundle, Shard, Teammate,
};
use clan_tracker::provider::{MockProvider, ProviderError};
use clan_tracker::resolve::{ResolveError, SourceSelector};
use clan_tracker::storage::{CacheStore, JsonlCacheStore, StorageConfig};
use clan_tracker::sync::BackgroundTasks;

struct Harness {
    _dir: TempDir,
    store: Arc<dyn CacheStore>,
    provider: Arc<MockProvider>,
    selector: SourceSelector,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(
            JsonlCacheStore::open(StorageConfig::new(dir.path().to_path_buf())).unwrap(),
        );
        let provider = Arc::new(MockProvider::new());
        let tasks = BackgroundTasks::new(store.clone(), 4);
        let selector = SourceSelector::new(store.clone(), provider.clone(), tasks);
        Self {
            _dir: dir,
            store,
            provider,
            selector,
        }
    }

    async fn settle(&self) {
        self.selector.tasks().wait_idle().await;
    }
}

fn clan_info() -> ClanInfo {
    ClanInfo {
        external_clan_id: Some("clan.night-owls".to_string()),
        name: "Night Owls".to_string(),
        tag: Some("NOWL".to_string()),
        level: Some(4),
        member_count: Some(12),
    }
}

fn game(index: i64) -> MatchSummary {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    MatchSummary {
        match_id: format!("match-{:02}", index),
        mode: "squad-fpp".to_string(),
        map_name: "Miramar".to_string(),
        category: MatchCategory::Normal,
        placement: if index % 5 == 0 { 1 } else { 8 },
        kills: 3,
        assists: 1,
        damage: 320.0,
        survive_time: 1100.0,
        headshot_kills: 1,
        created_at: base - Duration::minutes(index * 30),
        teammates: vec![Teammate {
            name: "Scout".to_string(),
            account_id: Some("account.scout".to_string()),
            kills: 3,
            assists: 1,
            damage: 320.0,
        }],
    }
}

fn scout(match_count: i64, with_clan: bool) -> PlayerBundle {
    let mut bundle = PlayerBundle::new(Shard::Steam, "Scout".to_string());
    bundle.profile.account_id = Some("account.scout".to_string());
    if with_clan {
        bundle.profile.clan = Some(clan_info());
    }
    bundle.recent_matches = (0..match_count).map(game).collect();
    bundle.summary.total_matches = match_count as u32;
    bundle.summary.avg_kills = 3.0;
    bundle
}

#[tokio::test]
async fn test_first_sighting_provisions_once_then_merges() {
    let h = Harness::new();
    h.provider.set_player(scout(25, true));

    let first = h.selector.resolve(Shard::Steam, "scout").await.unwrap();
    assert_eq!(first.data_source, DataSource::ExternalOnly);
    h.settle().await;

    let clan = h
        .store
        .find_clan_by_external_id("clan.night-owls")
        .await
        .unwrap()
        .expect("clan provisioned");
    let members = h.store.clan_members(&clan.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(clan.member_count, 1);

    let member = &members[0];
    let window = h.store.matches(&member.id).await.unwrap();
    assert_eq!(window.len(), 20);
    assert_eq!(window[0].match_external_id, "match-00");
    assert_eq!(window[19].match_external_id, "match-19");

    let second = h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(second.data_source, DataSource::Hybrid);
    h.settle().await;

    let again = h.store.matches(&member.id).await.unwrap();
    assert_eq!(again, window);
    assert_eq!(h.store.clan_members(&clan.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_live_response_keeps_twenty_newest_matches() {
    let h = Harness::new();
    let mut bundle = scout(25, true);
    bundle.recent_matches.reverse();
    h.provider.set_player(bundle);

    let first = h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(first.data_source, DataSource::ExternalOnly);
    assert_eq!(first.recent_matches.len(), 20);
    assert_eq!(first.recent_matches[0].match_id, "match-00");
    assert_eq!(first.recent_matches[19].match_id, "match-19");
    h.settle().await;

    let merged = h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(merged.data_source, DataSource::Hybrid);
    assert_eq!(merged.recent_matches.len(), 20);
    assert_eq!(merged.recent_matches[0].match_id, "match-00");

    let refreshed = h.selector.refresh(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(refreshed.recent_matches.len(), 20);
    h.settle().await;
}

#[tokio::test]
async fn test_concurrent_first_lookups_create_one_member() {
    let h = Harness::new();
    h.provider.set_player(scout(3, true));

    let lookups = (0..6).map(|_| h.selector.resolve(Shard::Steam, "Scout"));
    for result in futures::future::join_all(lookups).await {
        assert!(result.is_ok());
    }
    h.settle().await;

    let member = h
        .store
        .find_member(Shard::Steam, "scout")
        .await
        .unwrap()
        .expect("member provisioned");
    assert_eq!(h.store.clan_members(&member.clan_id).await.unwrap().len(), 1);
    assert_eq!(h.store.matches(&member.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_cache_fills_clan_when_live_feed_omits_it() {
    let h = Harness::new();
    h.provider.set_player(scout(4, true));
    h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    h.settle().await;

    let mut live = scout(2, false);
    live.summary.avg_kills = 7.5;
    h.provider.set_player(live);

    let merged = h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(merged.data_source, DataSource::Hybrid);
    assert_eq!(merged.summary.avg_kills, 7.5);
    assert_eq!(merged.recent_matches.len(), 2);
    let clan = merged.profile.clan.expect("clan from cache");
    assert_eq!(clan.name, "Night Owls");
    assert_eq!(merged.clan_members.len(), 1);
    h.settle().await;
}

#[tokio::test]
async fn test_provider_failure_falls_back_to_cache() {
    let h = Harness::new();
    h.provider.set_player(scout(5, true));
    h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    h.settle().await;

    h.provider
        .set_error(Shard::Steam, "Scout", ProviderError::Upstream("502".to_string()));

    let cached = h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(cached.data_source, DataSource::CacheOnly);
    assert_eq!(cached.recent_matches.len(), 5);
    assert!(!cached.ranked_summary.is_ranked());

    let refreshed = h.selector.refresh(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(refreshed.data_source, DataSource::CacheOnly);
}

#[tokio::test]
async fn test_unknown_everywhere_is_not_found() {
    let h = Harness::new();
    h.provider.set_error(
        Shard::Psn,
        "Nobody",
        ProviderError::RateLimited {
            retry_after_secs: 30,
        },
    );

    let err = h.selector.resolve(Shard::Psn, "Nobody").await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }));
    h.settle().await;
    assert!(h.store.find_member(Shard::Psn, "Nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_shards_are_separate_players() {
    let h = Harness::new();
    h.provider.set_player(scout(2, true));
    h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    h.settle().await;

    let err = h.selector.resolve(Shard::Kakao, "Scout").await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[tokio::test]
async fn test_player_without_matches_reconciles_to_zero_rates() {
    let h = Harness::new();
    h.provider.set_player(scout(0, false));

    let resolved = h.selector.resolve(Shard::Steam, "Scout").await.unwrap();
    assert_eq!(resolved.data_source, DataSource::ExternalOnly);
    assert!(resolved.clan_members.is_empty());
    h.settle().await;

    let member = h
        .store
        .find_member(Shard::Steam, "Scout")
        .await
        .unwrap()
        .expect("unaffiliated member");
    assert_eq!(member.win_rate, 0.0);
    assert_eq!(member.top10_rate, 0.0);
    assert!(h.store.matches(&member.id).await.unwrap().is_empty());
}
