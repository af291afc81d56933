//! Teammate synergy restricted to the clan roster.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::MatchSummary;

use super::{per_match, percentage};

/// Why a synergy report is (or is not) populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynergyStatus {
    Ok,
    /// The player has no clan roster to match against
    NotAffiliated,
    /// No match carried roster information
    NoTeammateData,
    /// Rosters exist but no clan member ever played alongside the player
    NoSharedMatches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeammateSynergy {
    pub name: String,
    pub games: u32,
    pub total_damage: f64,
    pub total_wins: u32,
    pub avg_damage: f64,

    /// Percentage of shared games won
    pub win_rate: f64,

    /// None when no shared game reported a placement
    pub avg_rank: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyReport {
    pub status: SynergyStatus,
    pub teammates: Vec<TeammateSynergy>,
}

impl SynergyReport {
    fn empty(status: SynergyStatus) -> Self {
        Self {
            status,
            teammates: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Accumulator {
    name: String,
    games: u32,
    total_damage: f64,
    total_wins: u32,
    total_rank: u64,
    rank_count: u32,
}

/// Aggregate co-play stats with clan members over recent matches.
///
/// Self and teammates outside the roster are skipped; names compare
/// case-insensitively. Output is sorted by games played, then name.
pub fn aggregate_synergy(
    matches: &[MatchSummary],
    roster: &[String],
    self_nickname: &str,
) -> SynergyReport {
    let me = self_nickname.to_lowercase();
    let clan: HashSet<String> = roster
        .iter()
        .map(|name| name.to_lowercase())
        .filter(|name| *name != me)
        .collect();

    if roster.is_empty() {
        return SynergyReport::empty(SynergyStatus::NotAffiliated);
    }
    if matches.iter().all(|m| m.teammates.is_empty()) {
        return SynergyReport::empty(SynergyStatus::NoTeammateData);
    }

    let mut stats: HashMap<String, Accumulator> = HashMap::new();
    for game in matches {
        let won = game.placement == 1;
        for mate in &game.teammates {
            let key = mate.name.to_lowercase();
            if key == me || !clan.contains(&key) {
                continue;
            }
            let entry = stats.entry(key).or_insert_with(|| Accumulator {
                name: mate.name.clone(),
                ..Default::default()
            });
            entry.games += 1;
            entry.total_damage += mate.damage;
            if won {
                entry.total_wins += 1;
            }
            if game.placement > 0 {
                entry.total_rank += game.placement as u64;
                entry.rank_count += 1;
            }
        }
    }

    if stats.is_empty() {
        return SynergyReport::empty(SynergyStatus::NoSharedMatches);
    }

    let mut teammates: Vec<TeammateSynergy> = stats
        .into_values()
        .map(|acc| {
            let games = acc.games as f64;
            TeammateSynergy {
                name: acc.name,
                games: acc.games,
                total_damage: acc.total_damage,
                total_wins: acc.total_wins,
                avg_damage: per_match(acc.total_damage, games),
                win_rate: percentage(acc.total_wins as f64, games),
                avg_rank: (acc.rank_count > 0)
                    .then(|| acc.total_rank as f64 / acc.rank_count as f64),
            }
        })
        .collect();
    teammates.sort_by(|a, b| b.games.cmp(&a.games).then_with(|| a.name.cmp(&b.name)));

    SynergyReport {
        status: SynergyStatus::Ok,
        teammates,
    }
}
