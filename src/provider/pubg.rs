//! PUBG-style JSON:API stats client.
//!
//! One lookup fans out into: player search, current season, season stats,
//! ranked stats, clan, and up to `max_recent_matches` match documents. Only
//! the player search is mandatory; every secondary call degrades to an
//! empty section with a warning.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::normalize::{self, Field};
use super::{ProviderError, StatsProvider};
use crate::calculate::{summary_from_mode_lines, MatchAggregates};
use crate::fetch::{FetchError, Fetcher, FetcherConfig};
use crate::models::{MatchSummary, PlayerBundle, RankedSummary, Shard, MATCH_WINDOW};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct PubgConfig {
    /// API root, e.g. `https://api.pubg.com`
    pub base_url: String,

    pub api_key: Option<String>,

    pub timeout: Duration,

    /// How many recent match documents to fetch (at most the match window)
    pub max_recent_matches: usize,

    /// Concurrent match document requests
    pub match_fetch_concurrency: usize,
}

impl Default for PubgConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pubg.com".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_recent_matches: MATCH_WINDOW,
            match_fetch_concurrency: 6,
        }
    }
}

/// Identity fields from the player search.
#[derive(Debug, Clone, PartialEq)]
struct PlayerRef {
    account_id: String,
    name: String,
    clan_id: Option<String>,
    match_ids: Vec<String>,
}

pub struct PubgClient {
    fetcher: Fetcher,
    config: PubgConfig,
}

impl PubgClient {
    pub fn new(config: PubgConfig) -> Result<Self, FetchError> {
        Url::parse(&config.base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let fetcher = Fetcher::new(FetcherConfig {
            timeout: config.timeout,
            api_key: config.api_key.clone(),
            ..FetcherConfig::default()
        })?;

        Ok(Self { fetcher, config })
    }

    fn url(&self, shard: Shard, path: &str) -> Result<Url, FetchError> {
        let raw = format!(
            "{}/shards/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            shard,
            path
        );
        Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    async fn find_player(&self, shard: Shard, nickname: &str) -> Result<PlayerRef, ProviderError> {
        let mut url = self.url(shard, "players")?;
        url.query_pairs_mut()
            .append_pair("filter[playerNames]", nickname);

        let doc = self.fetcher.get_json(&url).await?;
        parse_player_ref(&doc, self.config.max_recent_matches.min(MATCH_WINDOW))
            .ok_or(ProviderError::NotFound)
    }

    async fn current_season(&self, shard: Shard) -> Result<Option<String>, FetchError> {
        let doc = self.fetcher.get_json(&self.url(shard, "seasons")?).await?;
        Ok(parse_current_season(&doc))
    }

    async fn season_stats(
        &self,
        shard: Shard,
        account_id: &str,
        season: &str,
    ) -> Result<Value, FetchError> {
        let url = self.url(shard, &format!("players/{}/seasons/{}", account_id, season))?;
        let doc = self.fetcher.get_json(&url).await?;
        Ok(doc
            .pointer("/data/attributes/gameModeStats")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn ranked_stats(
        &self,
        shard: Shard,
        account_id: &str,
        season: &str,
    ) -> Result<Option<RankedSummary>, FetchError> {
        let url = self.url(
            shard,
            &format!("players/{}/seasons/{}/ranked", account_id, season),
        )?;
        let doc = self.fetcher.get_json(&url).await?;
        Ok(doc
            .pointer("/data/attributes/rankedGameModeStats")
            .and_then(normalize::ranked_summary))
    }

    async fn clan(
        &self,
        shard: Shard,
        clan_id: &str,
    ) -> Result<Option<crate::models::ClanInfo>, FetchError> {
        let doc = self
            .fetcher
            .get_json(&self.url(shard, &format!("clans/{}", clan_id))?)
            .await?;
        let attributes = doc.pointer("/data/attributes").unwrap_or(&Value::Null);
        Ok(normalize::clan_info(Some(clan_id.to_string()), attributes))
    }

    async fn recent_matches(&self, shard: Shard, player: &PlayerRef) -> Vec<MatchSummary> {
        let fetches = stream::iter(player.match_ids.clone().into_iter().map(|match_id| async move {
            let url = self.url(shard, &format!("matches/{}", match_id))?;
            let doc = self.fetcher.get_json(&url).await?;
            Ok::<_, FetchError>(normalize::parse_match(
                &doc,
                Some(&player.account_id),
                &player.name,
            ))
        }))
        .buffer_unordered(self.config.match_fetch_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

        let mut matches: Vec<MatchSummary> = Vec::with_capacity(fetches.len());
        for result in fetches {
            match result {
                Ok(Some(summary)) => matches.push(summary),
                Ok(None) => debug!("Player {} missing from match document", player.name),
                Err(e) => warn!("Failed to fetch match for {}: {}", player.name, e),
            }
        }

        sort_most_recent_first(&mut matches);
        matches
    }
}

#[async_trait]
impl StatsProvider for PubgClient {
    fn name(&self) -> &'static str {
        "pubg"
    }

    async fn fetch_player(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<PlayerBundle, ProviderError> {
        let player = self.find_player(shard, nickname).await?;
        info!(
            "Found {} ({}) with {} recent matches",
            player.name,
            player.account_id,
            player.match_ids.len()
        );

        let mut bundle = PlayerBundle::new(shard, player.name.clone());
        bundle.profile.account_id = Some(player.account_id.clone());

        let season_section = async {
            let season = match self.current_season(shard).await {
                Ok(Some(season)) => season,
                Ok(None) => {
                    warn!("No current season reported for {}", shard);
                    return None;
                }
                Err(e) => {
                    warn!("Failed to fetch seasons for {}: {}", shard, e);
                    return None;
                }
            };
            let (stats, ranked) = tokio::join!(
                self.season_stats(shard, &player.account_id, &season),
                self.ranked_stats(shard, &player.account_id, &season)
            );
            let stats = stats
                .map_err(|e| warn!("Failed to fetch season stats for {}: {}", player.name, e))
                .ok();
            let ranked = ranked
                .map_err(|e| warn!("Failed to fetch ranked stats for {}: {}", player.name, e))
                .ok()
                .flatten();
            Some((season, stats, ranked))
        };

        let clan_section = async {
            let clan_id = player.clan_id.as_deref()?;
            self.clan(shard, clan_id)
                .await
                .map_err(|e| warn!("Failed to fetch clan {}: {}", clan_id, e))
                .ok()
                .flatten()
        };

        let (season_section, clan, matches) = tokio::join!(
            season_section,
            clan_section,
            self.recent_matches(shard, &player)
        );

        if let Some((season, stats, ranked)) = season_section {
            if let Some(stats) = stats {
                let lines = normalize::mode_stat_lines(&stats);
                if !lines.is_empty() {
                    bundle.mode_stats_by_season.insert(season, lines);
                }
            }
            bundle.ranked_summary = ranked;
        }

        bundle.profile.clan = clan;
        bundle.recent_matches = matches;
        bundle.summary = if bundle.mode_stats_by_season.is_empty() {
            MatchAggregates::from_matches(&bundle.recent_matches).to_summary()
        } else {
            summary_from_mode_lines(bundle.mode_stats_by_season.values().flat_map(|m| m.values()))
        };

        Ok(bundle)
    }
}

fn parse_player_ref(doc: &Value, max_matches: usize) -> Option<PlayerRef> {
    let player = doc.get("data")?.as_array()?.first()?;
    let account_id = player.get("id")?.as_str()?.to_string();
    let attributes = player.get("attributes").unwrap_or(&Value::Null);
    let name = normalize::text(attributes, Field::PlayerName)?;

    let match_ids = player
        .pointer("/relationships/matches/data")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .take(max_matches)
        .map(str::to_string)
        .collect();

    Some(PlayerRef {
        account_id,
        name,
        clan_id: normalize::text(attributes, Field::ClanId),
        match_ids,
    })
}

fn parse_current_season(doc: &Value) -> Option<String> {
    doc.get("data")?
        .as_array()?
        .iter()
        .find(|season| {
            season
                .pointer("/attributes/isCurrentSeason")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .and_then(|season| season.get("id")?.as_str())
        .map(str::to_string)
}

fn sort_most_recent_first(matches: &mut [MatchSummary]) {
    matches.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.match_id.cmp(&b.match_id))
    });
}
