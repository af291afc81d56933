//! Building resolved bundles from live data, cached rows, or both.

use std::collections::BTreeMap;

use crate::calculate::{match_window, mode_distribution, MatchAggregates};
use crate::models::{
    Clan, ClanInfo, ClanMember, DataSource, MatchRecord, MatchSummary, ModeStats,
    ModeStatsBySeason, PlayerBundle, PlayerProfile, RankedSummary, ResolvedBundle, StatsSummary,
};

/// Everything the cache knows about one member.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedView {
    pub member: ClanMember,

    /// None if the member's clan row is missing
    pub clan: Option<Clan>,

    /// Members of the cached clan; empty for the sentinel clan
    pub roster: Vec<ClanMember>,

    pub matches: Vec<MatchRecord>,
    pub mode_stats: Vec<ModeStats>,
}

impl CachedView {
    /// Real clan affiliation, if any.
    pub fn clan_info(&self) -> Option<ClanInfo> {
        self.clan
            .as_ref()
            .filter(|clan| !clan.is_unaffiliated())
            .map(clan_info)
    }

    /// Cached matches as summaries, newest first.
    pub fn recent_matches(&self) -> Vec<MatchSummary> {
        let matches: Vec<MatchSummary> =
            self.matches.iter().map(MatchRecord::to_summary).collect();
        match_window(&matches)
    }

    pub fn mode_stats_by_season(&self) -> ModeStatsBySeason {
        let mut grouped: ModeStatsBySeason = BTreeMap::new();
        for row in &self.mode_stats {
            grouped
                .entry(row.season.clone())
                .or_default()
                .insert(row.mode.clone(), row.to_line());
        }
        grouped
    }

    /// Summary from the cached window, or the member's stored averages when
    /// no matches are cached.
    pub fn summary(&self) -> StatsSummary {
        if !self.matches.is_empty() {
            return MatchAggregates::from_matches(&self.recent_matches()).to_summary();
        }
        StatsSummary {
            avg_damage: self.member.avg_damage,
            avg_kills: self.member.avg_kills,
            avg_assists: self.member.avg_assists,
            avg_survival_time: self.member.avg_survive_time,
            win_rate: self.member.win_rate,
            top10_rate: self.member.top10_rate,
            ..StatsSummary::default()
        }
    }
}

pub fn clan_info(clan: &Clan) -> ClanInfo {
    ClanInfo {
        external_clan_id: clan.external_clan_id.clone(),
        name: clan.name.clone(),
        tag: clan.tag.clone(),
        level: clan.level,
        member_count: Some(clan.member_count),
    }
}

/// Roster ordering used everywhere: score descending, then nickname.
pub fn sort_roster(roster: &mut [ClanMember]) {
    roster.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.nickname.to_lowercase().cmp(&b.nickname.to_lowercase()))
    });
}

fn assemble(
    profile: PlayerProfile,
    summary: StatsSummary,
    ranked_summary: Option<RankedSummary>,
    recent_matches: Vec<MatchSummary>,
    mode_stats_by_season: ModeStatsBySeason,
    mut clan_members: Vec<ClanMember>,
    data_source: DataSource,
) -> ResolvedBundle {
    sort_roster(&mut clan_members);
    let recent_matches = match_window(&recent_matches);
    ResolvedBundle {
        mode_distribution: mode_distribution(&recent_matches),
        profile,
        summary,
        ranked_summary: ranked_summary.unwrap_or_else(RankedSummary::unranked),
        recent_matches,
        mode_stats_by_season,
        clan_members,
        data_source,
    }
}

/// A live bundle as-is. Used for first-seen players and explicit refreshes.
pub fn from_live(
    bundle: PlayerBundle,
    roster: Vec<ClanMember>,
    data_source: DataSource,
) -> ResolvedBundle {
    assemble(
        bundle.profile,
        bundle.summary,
        bundle.ranked_summary,
        bundle.recent_matches,
        bundle.mode_stats_by_season,
        roster,
        data_source,
    )
}

/// Live fields win; the cache fills whatever the live feed left empty.
pub fn merge(bundle: PlayerBundle, view: &CachedView, roster: Vec<ClanMember>) -> ResolvedBundle {
    let mut profile = bundle.profile;
    if profile.clan.is_none() {
        profile.clan = view.clan_info();
    }
    if profile.account_id.is_none() {
        profile.account_id = view.member.external_player_id.clone();
    }

    let summary = if bundle.summary.total_matches == 0 {
        view.summary()
    } else {
        bundle.summary
    };

    let recent_matches = if bundle.recent_matches.is_empty() {
        view.recent_matches()
    } else {
        bundle.recent_matches
    };

    let mode_stats_by_season = if bundle.mode_stats_by_season.is_empty() {
        view.mode_stats_by_season()
    } else {
        bundle.mode_stats_by_season
    };

    assemble(
        profile,
        summary,
        bundle.ranked_summary,
        recent_matches,
        mode_stats_by_season,
        roster,
        DataSource::Hybrid,
    )
}

/// Cache-only view for when the live fetch failed. Ranked data is never
/// cached, so it is reported as unranked.
pub fn project_cache(view: &CachedView) -> ResolvedBundle {
    let profile = PlayerProfile {
        nickname: view.member.nickname.clone(),
        account_id: view.member.external_player_id.clone(),
        shard: view.member.shard,
        clan: view.clan_info(),
        last_updated: view.member.last_updated,
    };

    assemble(
        profile,
        view.summary(),
        None,
        view.recent_matches(),
        view.mode_stats_by_season(),
        view.roster.clone(),
        DataSource::CacheOnly,
    )
}
