//! Cache refresh from a freshly fetched bundle.
//!
//! Three steps run in order, each independent of the others:
//! 1. Recompute the member's aggregates from the fetched match list
//! 2. Replace the member's match window
//! 3. Replace the member's mode-stats rows
//!
//! A failed step is logged and recorded in the report; earlier steps are not
//! rolled back. A member row that no longer exists stops the run before any
//! match or mode-stats rows are written. Every step is a full replace, so
//! reconciling the same bundle twice leaves the store unchanged.

use tracing::{debug, warn};

use crate::calculate::{classify, match_window, member_score, MatchAggregates, PlaystyleInput};
use crate::models::{MatchRecord, MatchSummary, MemberId, ModeStats, PlayerBundle};
use crate::storage::{CacheStore, StorageError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub member_updated: bool,
    pub matches_written: Option<usize>,
    pub mode_stats_written: Option<usize>,

    /// One entry per failed step
    pub failures: Vec<String>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, step: &str, err: &StorageError) {
        warn!("Reconcile step '{}' failed: {}", step, err);
        self.failures.push(format!("{}: {}", step, err));
    }
}

pub async fn reconcile(
    store: &dyn CacheStore,
    member_id: &MemberId,
    bundle: &PlayerBundle,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let window = match_window(&bundle.recent_matches);

    match update_member(store, member_id, bundle, &window).await {
        Ok(()) => report.member_updated = true,
        Err(e @ StorageError::RecordNotFound(_)) => {
            // Matches and mode stats must belong to a member row.
            report.fail("member", &e);
            return report;
        }
        Err(e) => report.fail("member", &e),
    }

    let records: Vec<MatchRecord> = window
        .iter()
        .map(|summary| MatchRecord::from_summary(member_id, summary))
        .collect();
    match store.replace_matches(member_id, records).await {
        Ok(written) => report.matches_written = Some(written),
        Err(e) => report.fail("matches", &e),
    }

    let stats: Vec<ModeStats> = bundle
        .mode_stats_by_season
        .iter()
        .flat_map(|(season, modes)| {
            modes
                .values()
                .map(move |line| ModeStats::from_line(member_id, season, line))
        })
        .collect();
    match store.replace_mode_stats(member_id, stats).await {
        Ok(written) => report.mode_stats_written = Some(written),
        Err(e) => report.fail("mode_stats", &e),
    }

    report
}

/// Step 1. Upstream summary fields are not trusted; everything is derived
/// from the match window.
async fn update_member(
    store: &dyn CacheStore,
    member_id: &MemberId,
    bundle: &PlayerBundle,
    window: &[MatchSummary],
) -> Result<(), StorageError> {
    let mut member = store
        .member(member_id)
        .await?
        .ok_or_else(|| StorageError::RecordNotFound(format!("member {}", member_id)))?;

    let summary = MatchAggregates::from_matches(window).to_summary();
    let classification = classify(&PlaystyleInput::from(&summary));

    member.avg_damage = summary.avg_damage;
    member.avg_kills = summary.avg_kills;
    member.avg_assists = summary.avg_assists;
    member.avg_survive_time = summary.avg_survival_time;
    member.win_rate = summary.win_rate;
    member.top10_rate = summary.top10_rate;
    member.score = member_score(&summary);
    member.style = Some(classification.play_style);
    if bundle.profile.account_id.is_some() {
        member.external_player_id = bundle.profile.account_id.clone();
    }
    member.last_updated = Some(bundle.fetched_at);

    debug!(
        matches = summary.total_matches,
        win_rate = member.win_rate,
        top10_rate = member.top10_rate,
        "Recomputed member aggregates"
    );
    store.upsert_member(member).await
}
