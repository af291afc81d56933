//! Normalized provider bundles and the resolved view handed to callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClanMember, MatchCategory, Shard};
use crate::calculate::{per_match, percentage};

/// Clan affiliation as reported by the provider (or recovered from cache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClanInfo {
    pub external_clan_id: Option<String>,
    pub name: String,
    pub tag: Option<String>,
    pub level: Option<u32>,
    pub member_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Canonical nickname (provider casing when known)
    pub nickname: String,

    /// Provider account id
    pub account_id: Option<String>,

    pub shard: Shard,

    pub clan: Option<ClanInfo>,

    pub last_updated: Option<DateTime<Utc>>,
}

/// Aggregate stats across modes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_matches: u32,
    pub wins: u32,
    pub top10s: u32,
    pub kills: u32,
    pub assists: u32,
    pub headshot_kills: u32,
    pub avg_damage: f64,
    pub avg_kills: f64,
    pub avg_assists: f64,

    /// Average survival time in seconds
    pub avg_survival_time: f64,

    /// Percentage (0-100)
    pub win_rate: f64,

    /// Percentage (0-100)
    pub top10_rate: f64,

    /// Kills per death
    pub kd: f64,

    /// Headshot kills as a percentage of kills
    pub headshot_rate: f64,
}

/// Ranked queue summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSummary {
    pub tier: String,
    pub sub_tier: Option<String>,
    pub rank_point: f64,
    pub rounds_played: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub top10_rate: f64,
    pub kda: f64,
    pub avg_damage: f64,
}

impl RankedSummary {
    pub const UNRANKED: &'static str = "Unranked";

    /// Placeholder for players without ranked data.
    pub fn unranked() -> Self {
        Self {
            tier: Self::UNRANKED.to_string(),
            sub_tier: None,
            rank_point: 0.0,
            rounds_played: 0,
            wins: 0,
            win_rate: 0.0,
            top10_rate: 0.0,
            kda: 0.0,
            avg_damage: 0.0,
        }
    }

    pub fn is_ranked(&self) -> bool {
        self.tier != Self::UNRANKED
    }
}

/// A teammate on the player's roster in one match. Includes the player themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teammate {
    pub name: String,
    pub account_id: Option<String>,
    pub kills: u32,
    pub assists: u32,
    pub damage: f64,
}

/// One recent match from the player's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub mode: String,
    pub map_name: String,
    pub category: MatchCategory,

    /// Team placement (1 = win)
    pub placement: u32,

    pub kills: u32,
    pub assists: u32,
    pub damage: f64,

    /// Seconds
    pub survive_time: f64,

    pub headshot_kills: u32,
    pub created_at: DateTime<Utc>,

    /// Roster for this match; empty when unknown (e.g. cache projection)
    #[serde(default)]
    pub teammates: Vec<Teammate>,
}

/// Season stats for one game mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeStatLine {
    pub mode: String,
    pub matches: u32,
    pub wins: u32,
    pub top10s: u32,
    pub kills: u32,
    pub assists: u32,
    pub headshot_kills: u32,
    pub damage_dealt: f64,
    pub time_survived: f64,
    pub avg_damage: f64,
    pub avg_kills: f64,
    pub avg_assists: f64,
    pub win_rate: f64,
    pub top10_rate: f64,
}

impl ModeStatLine {
    /// Build a line from raw totals, deriving averages and rates.
    #[allow(clippy::too_many_arguments)]
    pub fn from_totals(
        mode: String,
        matches: u32,
        wins: u32,
        top10s: u32,
        kills: u32,
        assists: u32,
        headshot_kills: u32,
        damage_dealt: f64,
        time_survived: f64,
    ) -> Self {
        let games = matches as f64;
        Self {
            mode,
            matches,
            wins,
            top10s,
            kills,
            assists,
            headshot_kills,
            damage_dealt,
            time_survived,
            avg_damage: per_match(damage_dealt, games),
            avg_kills: per_match(kills as f64, games),
            avg_assists: per_match(assists as f64, games),
            win_rate: percentage(wins as f64, games),
            top10_rate: percentage(top10s as f64, games),
        }
    }
}

/// Season id → mode → stats.
pub type ModeStatsBySeason = BTreeMap<String, BTreeMap<String, ModeStatLine>>;

/// Normalized live bundle produced by a stats provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBundle {
    pub profile: PlayerProfile,
    pub summary: StatsSummary,
    pub ranked_summary: Option<RankedSummary>,

    /// Most recent first
    pub recent_matches: Vec<MatchSummary>,

    pub mode_stats_by_season: ModeStatsBySeason,

    pub fetched_at: DateTime<Utc>,
}

impl PlayerBundle {
    /// An empty bundle for a player; providers fill in what they find.
    pub fn new(shard: Shard, nickname: String) -> Self {
        let fetched_at = Utc::now();
        Self {
            profile: PlayerProfile {
                nickname,
                account_id: None,
                shard,
                clan: None,
                last_updated: Some(fetched_at),
            },
            summary: StatsSummary::default(),
            ranked_summary: None,
            recent_matches: Vec::new(),
            mode_stats_by_season: ModeStatsBySeason::new(),
            fetched_at,
        }
    }
}

/// Share of recent matches per queue category, as percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeDistribution {
    pub ranked: f64,
    pub normal: f64,
    pub event: f64,
}

/// Which tier(s) supplied a resolved bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    /// Cache only; the live fetch failed
    #[serde(rename = "database")]
    CacheOnly,

    /// Cache row enhanced with a live fetch
    #[serde(rename = "db_with_api_enhancement")]
    Hybrid,

    /// Unseen player served straight from the live feed
    #[serde(rename = "pubg_api_only")]
    ExternalOnly,

    /// Explicit live refresh
    #[serde(rename = "pubg_api")]
    Live,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::CacheOnly => "database",
            DataSource::Hybrid => "db_with_api_enhancement",
            DataSource::ExternalOnly => "pubg_api_only",
            DataSource::Live => "pubg_api",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified view returned to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBundle {
    pub profile: PlayerProfile,
    pub summary: StatsSummary,
    pub ranked_summary: RankedSummary,
    pub recent_matches: Vec<MatchSummary>,
    pub mode_stats_by_season: ModeStatsBySeason,
    pub clan_members: Vec<ClanMember>,
    pub mode_distribution: ModeDistribution,
    pub data_source: DataSource,
}
