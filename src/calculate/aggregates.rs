//! Aggregates derived from match lists and season stat lines.

use crate::models::{
    MatchCategory, MatchSummary, ModeDistribution, ModeStatLine, StatsSummary, MATCH_WINDOW,
};

use super::{kd_ratio, per_match, percentage};

/// The most recent [`MATCH_WINDOW`] matches, newest first. Ties on
/// `created_at` order by match id so the window is stable.
pub fn match_window(matches: &[MatchSummary]) -> Vec<MatchSummary> {
    let mut window = matches.to_vec();
    window.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.match_id.cmp(&b.match_id))
    });
    window.truncate(MATCH_WINDOW);
    window
}

/// Aggregates recomputed from a fetched match list.
///
/// A win is `placement == 1`, a top 10 is `placement <= 10`. Placement 0 means
/// the provider did not report one and counts as neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchAggregates {
    pub total_matches: u32,
    pub wins: u32,
    pub top10s: u32,
    pub kills: u32,
    pub assists: u32,
    pub headshot_kills: u32,
    pub avg_damage: f64,
    pub avg_kills: f64,
    pub avg_assists: f64,
    pub avg_survival_time: f64,
    pub win_rate: f64,
    pub top10_rate: f64,
}

impl MatchAggregates {
    pub fn from_matches(matches: &[MatchSummary]) -> Self {
        let total_matches = matches.len() as u32;
        let games = total_matches as f64;

        let wins = matches.iter().filter(|m| m.placement == 1).count() as u32;
        let top10s = matches
            .iter()
            .filter(|m| m.placement >= 1 && m.placement <= 10)
            .count() as u32;
        let kills = saturating_total(matches.iter().map(|m| m.kills));
        let assists = saturating_total(matches.iter().map(|m| m.assists));
        let headshot_kills = saturating_total(matches.iter().map(|m| m.headshot_kills));
        let damage: f64 = matches.iter().map(|m| m.damage).sum();
        let survival: f64 = matches.iter().map(|m| m.survive_time).sum();

        Self {
            total_matches,
            wins,
            top10s,
            kills,
            assists,
            headshot_kills,
            avg_damage: per_match(damage, games),
            avg_kills: per_match(kills as f64, games),
            avg_assists: per_match(assists as f64, games),
            avg_survival_time: per_match(survival, games),
            win_rate: percentage(wins as f64, games),
            top10_rate: percentage(top10s as f64, games),
        }
    }

    pub fn to_summary(&self) -> StatsSummary {
        StatsSummary {
            total_matches: self.total_matches,
            wins: self.wins,
            top10s: self.top10s,
            kills: self.kills,
            assists: self.assists,
            headshot_kills: self.headshot_kills,
            avg_damage: self.avg_damage,
            avg_kills: self.avg_kills,
            avg_assists: self.avg_assists,
            avg_survival_time: self.avg_survival_time,
            win_rate: self.win_rate,
            top10_rate: self.top10_rate,
            kd: kd_ratio(self.kills, self.total_matches, self.wins),
            headshot_rate: percentage(self.headshot_kills as f64, self.kills as f64),
        }
    }
}

/// Counters from the feed are already capped at `u32::MAX`; totals stay capped.
fn saturating_total(values: impl Iterator<Item = u32>) -> u32 {
    values.fold(0u32, u32::saturating_add)
}

/// Fold per-mode season lines into one summary.
pub fn summary_from_mode_lines<'a, I>(lines: I) -> StatsSummary
where
    I: IntoIterator<Item = &'a ModeStatLine>,
{
    let mut matches = 0u32;
    let mut wins = 0u32;
    let mut top10s = 0u32;
    let mut kills = 0u32;
    let mut assists = 0u32;
    let mut headshot_kills = 0u32;
    let mut damage = 0.0;
    let mut survival = 0.0;

    for line in lines {
        matches = matches.saturating_add(line.matches);
        wins = wins.saturating_add(line.wins);
        top10s = top10s.saturating_add(line.top10s);
        kills = kills.saturating_add(line.kills);
        assists = assists.saturating_add(line.assists);
        headshot_kills = headshot_kills.saturating_add(line.headshot_kills);
        damage += line.damage_dealt;
        survival += line.time_survived;
    }

    let games = matches as f64;
    StatsSummary {
        total_matches: matches,
        wins,
        top10s,
        kills,
        assists,
        headshot_kills,
        avg_damage: per_match(damage, games),
        avg_kills: per_match(kills as f64, games),
        avg_assists: per_match(assists as f64, games),
        avg_survival_time: per_match(survival, games),
        win_rate: percentage(wins as f64, games),
        top10_rate: percentage(top10s as f64, games),
        kd: kd_ratio(kills, matches, wins),
        headshot_rate: percentage(headshot_kills as f64, kills as f64),
    }
}

/// Share of ranked / normal / event matches in a match list.
pub fn mode_distribution(matches: &[MatchSummary]) -> ModeDistribution {
    let total = matches.len() as f64;
    let count = |category: MatchCategory| {
        matches.iter().filter(|m| m.category == category).count() as f64
    };
    ModeDistribution {
        ranked: percentage(count(MatchCategory::Ranked), total),
        normal: percentage(count(MatchCategory::Normal), total),
        event: percentage(count(MatchCategory::Event), total),
    }
}

/// Composite score used to rank members inside a clan.
pub fn member_score(summary: &StatsSummary) -> f64 {
    (summary.avg_damage * 0.5
        + summary.avg_kills * 50.0
        + summary.top10_rate
        + summary.win_rate * 2.0)
        .round()
}
