use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{aggregate_synergy, analyze, PlayerAnalysis, PlaystyleInput, SynergyReport};
use crate::models::{ResolvedBundle, Shard};

/// Resolved bundle plus the read-side analytics computed over it.
#[derive(Debug, Serialize)]
pub struct PlayerResponse {
    #[serde(flatten)]
    pub bundle: ResolvedBundle,
    pub analysis: PlayerAnalysis,
    pub synergy: SynergyReport,
}

impl PlayerResponse {
    pub fn from_resolved(bundle: ResolvedBundle) -> Self {
        let analysis = analyze(&PlaystyleInput::from(&bundle.summary));
        let roster: Vec<String> = bundle
            .clan_members
            .iter()
            .map(|member| member.nickname.clone())
            .collect();
        let synergy = aggregate_synergy(&bundle.recent_matches, &roster, &bundle.profile.nickname);

        Self {
            bundle,
            analysis,
            synergy,
        }
    }
}

fn parse_shard(raw: &str) -> Result<Shard, ApiError> {
    raw.parse::<Shard>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn get_player(
    State(state): State<AppState>,
    Path((shard, nickname)): Path<(String, String)>,
) -> Result<Json<PlayerResponse>, ApiError> {
    let shard = parse_shard(&shard)?;
    let resolved = state.selector.resolve(shard, &nickname).await?;
    Ok(Json(PlayerResponse::from_resolved(resolved)))
}

pub async fn refresh_player(
    State(state): State<AppState>,
    Path((shard, nickname)): Path<(String, String)>,
) -> Result<Json<PlayerResponse>, ApiError> {
    let shard = parse_shard(&shard)?;
    let resolved = state.selector.refresh(shard, &nickname).await?;
    Ok(Json(PlayerResponse::from_resolved(resolved)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_router;
    use crate::models::{Clan, ClanInfo, ClanMember, MatchCategory, MatchSummary, PlayerBundle, Teammate};
    use crate::provider::{MockProvider, ProviderError};
    use crate::resolve::SourceSelector;
    use crate::storage::{CacheStore, JsonlCacheStore, StorageConfig};
    use crate::sync::BackgroundTasks;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn setup_test_state(dir: &std::path::Path, provider: MockProvider) -> AppState {
        let store: Arc<dyn CacheStore> =
            Arc::new(JsonlCacheStore::open(StorageConfig::new(dir.to_path_buf())).unwrap());
        let tasks = BackgroundTasks::new(store.clone(), 4);
        let selector = SourceSelector::new(store, Arc::new(provider), tasks);
        AppState::new(selector, "*")
    }

    async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn teammate(name: &str) -> Teammate {
        Teammate {
            name: name.to_string(),
            account_id: None,
            kills: 1,
            assists: 0,
            damage: 120.0,
        }
    }

    fn clan_player() -> PlayerBundle {
        let mut bundle = PlayerBundle::new(Shard::Steam, "Leader".to_string());
        bundle.profile.clan = Some(ClanInfo {
            external_clan_id: Some("clan.api".to_string()),
            name: "Api Clan".to_string(),
            tag: None,
            level: None,
            member_count: None,
        });
        bundle.recent_matches = vec![MatchSummary {
            match_id: "m1".to_string(),
            mode: "squad".to_string(),
            map_name: "Erangel".to_string(),
            category: MatchCategory::Ranked,
            placement: 1,
            kills: 4,
            assists: 2,
            damage: 410.0,
            survive_time: 1500.0,
            headshot_kills: 1,
            created_at: Utc::now(),
            teammates: vec![teammate("Leader"), teammate("Buddy"), teammate("Stranger")],
        }];
        bundle.summary.total_matches = 1;
        bundle.summary.avg_kills = 4.0;
        bundle
    }

    #[tokio::test]
    async fn test_get_player_external_only() {
        let temp_dir = TempDir::new().unwrap();
        let state = setup_test_state(temp_dir.path(), MockProvider::new().with_player(clan_player()));

        let clan = Clan::new("clan.api".to_string(), "Api Clan".to_string());
        state.store.insert_clan_if_absent(clan.clone()).await.unwrap();
        state
            .store
            .upsert_member(ClanMember::new(Shard::Steam, "Buddy".to_string(), clan.id.clone()))
            .await
            .unwrap();

        let (status, json) = send(build_router(state.clone()), "GET", "/api/players/STEAM/leader").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data_source"], "pubg_api_only");
        assert_eq!(json["profile"]["nickname"], "Leader");
        assert_eq!(json["ranked_summary"]["tier"], "Unranked");
        assert_eq!(json["mode_distribution"]["ranked"], 100.0);
        assert!(json["analysis"]["play_style"].is_string());
        assert_eq!(json["synergy"]["status"], "ok");
        assert_eq!(json["synergy"]["teammates"].as_array().unwrap().len(), 1);
        assert_eq!(json["synergy"]["teammates"][0]["name"], "Buddy");

        state.selector.tasks().wait_idle().await;
    }

    #[tokio::test]
    async fn test_get_player_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let state = setup_test_state(
            temp_dir.path(),
            MockProvider::new().with_error(
                Shard::Kakao,
                "ghost",
                ProviderError::RateLimited {
                    retry_after_secs: 10,
                },
            ),
        );

        let (status, json) = send(build_router(state), "GET", "/api/players/kakao/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "PLAYER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_bad_shard_and_nickname() {
        let temp_dir = TempDir::new().unwrap();
        let state = setup_test_state(temp_dir.path(), MockProvider::new());

        let (status, json) = send(build_router(state.clone()), "GET", "/api/players/stadia/someone").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");

        let (status, _) = send(build_router(state), "GET", "/api/players/steam/x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_player() {
        let temp_dir = TempDir::new().unwrap();
        let state = setup_test_state(temp_dir.path(), MockProvider::new().with_player(clan_player()));

        let (status, json) = send(
            build_router(state.clone()),
            "POST",
            "/api/players/steam/Leader/refresh",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data_source"], "pubg_api");

        state.selector.tasks().wait_idle().await;
        let clan = state
            .store
            .find_clan_by_external_id("clan.api")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(clan.member_count, 1);
    }

    #[tokio::test]
    async fn test_cache_only_player_is_not_affiliated() {
        let temp_dir = TempDir::new().unwrap();
        let state = setup_test_state(temp_dir.path(), MockProvider::new());
        state
            .store
            .upsert_member(ClanMember::new(Shard::Xbox, "Loner".to_string(), Clan::unaffiliated_id()))
            .await
            .unwrap();

        let (status, json) = send(build_router(state), "GET", "/api/players/xbox/loner").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data_source"], "database");
        assert_eq!(json["synergy"]["status"], "not_affiliated");
        assert!(json["profile"]["clan"].is_null());
    }
}
