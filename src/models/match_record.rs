//! Persisted match window and per-mode stats rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, MatchId, MatchSummary, MemberId, ModeStatLine, ModeStatsId};

/// Maximum number of matches kept per member.
pub const MATCH_WINDOW: usize = 20;

/// Queue category used for the mode distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchCategory {
    Ranked,
    #[default]
    Normal,
    Event,
}

impl MatchCategory {
    /// Classify a provider match type string.
    ///
    /// `competitive` is ranked, `official` and anything unrecognised is normal,
    /// arcade/event/custom style queues count as event.
    pub fn from_match_type(match_type: &str) -> Self {
        match match_type.trim().to_ascii_lowercase().as_str() {
            "competitive" | "ranked" => MatchCategory::Ranked,
            "event" | "arcade" | "custom" | "seasonal" | "training" => MatchCategory::Event,
            _ => MatchCategory::Normal,
        }
    }
}

/// One persisted match in a member's sliding window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Unique identifier (derived from member + provider match id)
    pub id: MatchId,

    pub clan_member_id: MemberId,

    /// Provider match id
    pub match_external_id: String,

    /// Game mode (e.g. "squad-fpp")
    pub mode: String,

    pub map_name: String,

    #[serde(default)]
    pub category: MatchCategory,

    /// Final team placement (1 = win)
    pub placement: u32,

    pub kills: u32,
    pub assists: u32,
    pub damage: f64,

    /// Survival time in seconds
    pub survive_time: f64,

    /// When the match was played
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Build the persisted row for a fetched match.
    pub fn from_summary(member_id: &MemberId, summary: &MatchSummary) -> Self {
        Self {
            id: EntityId::generate(&["match", member_id.as_str(), &summary.match_id]),
            clan_member_id: member_id.clone(),
            match_external_id: summary.match_id.clone(),
            mode: summary.mode.clone(),
            map_name: summary.map_name.clone(),
            category: summary.category,
            placement: summary.placement,
            kills: summary.kills,
            assists: summary.assists,
            damage: summary.damage,
            survive_time: summary.survive_time,
            created_at: summary.created_at,
        }
    }

    /// Project back to a match summary. Teammates are never persisted.
    pub fn to_summary(&self) -> MatchSummary {
        MatchSummary {
            match_id: self.match_external_id.clone(),
            mode: self.mode.clone(),
            map_name: self.map_name.clone(),
            category: self.category,
            placement: self.placement,
            kills: self.kills,
            assists: self.assists,
            damage: self.damage,
            survive_time: self.survive_time,
            headshot_kills: 0,
            created_at: self.created_at,
            teammates: Vec::new(),
        }
    }
}

/// Per-(member, season, mode) stats row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeStats {
    pub id: ModeStatsId,
    pub clan_member_id: MemberId,
    pub season: String,
    pub mode: String,
    pub matches: u32,
    pub wins: u32,
    pub top10s: u32,
    pub avg_damage: f64,
    pub avg_kills: f64,
    pub avg_assists: f64,
    pub win_rate: f64,
    pub top10_rate: f64,
}

impl ModeStats {
    pub fn from_line(member_id: &MemberId, season: &str, line: &ModeStatLine) -> Self {
        Self {
            id: EntityId::generate(&["mode-stats", member_id.as_str(), season, &line.mode]),
            clan_member_id: member_id.clone(),
            season: season.to_string(),
            mode: line.mode.clone(),
            matches: line.matches,
            wins: line.wins,
            top10s: line.top10s,
            avg_damage: line.avg_damage,
            avg_kills: line.avg_kills,
            avg_assists: line.avg_assists,
            win_rate: line.win_rate,
            top10_rate: line.top10_rate,
        }
    }

    /// Rebuild a stat line; totals are recovered from the stored averages.
    pub fn to_line(&self) -> ModeStatLine {
        let matches = self.matches as f64;
        ModeStatLine {
            mode: self.mode.clone(),
            matches: self.matches,
            wins: self.wins,
            top10s: self.top10s,
            kills: (self.avg_kills * matches).round() as u32,
            assists: (self.avg_assists * matches).round() as u32,
            headshot_kills: 0,
            damage_dealt: self.avg_damage * matches,
            time_survived: 0.0,
            avg_damage: self.avg_damage,
            avg_kills: self.avg_kills,
            avg_assists: self.avg_assists,
            win_rate: self.win_rate,
            top10_rate: self.top10_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(id: &str) -> MatchSummary {
        MatchSummary {
            match_id: id.to_string(),
            mode: "squad-fpp".to_string(),
            map_name: "Erangel".to_string(),
            category: MatchCategory::Ranked,
            placement: 3,
            kills: 4,
            assists: 1,
            damage: 412.5,
            survive_time: 1320.0,
            headshot_kills: 2,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            teammates: Vec::new(),
        }
    }

    #[test]
    fn test_match_category_from_type() {
        assert_eq!(MatchCategory::from_match_type("competitive"), MatchCategory::Ranked);
        assert_eq!(MatchCategory::from_match_type("official"), MatchCategory::Normal);
        assert_eq!(MatchCategory::from_match_type("Arcade"), MatchCategory::Event);
        assert_eq!(MatchCategory::from_match_type(""), MatchCategory::Normal);
    }

    #[test]
    fn test_match_record_id_deterministic() {
        let member: MemberId = "member-1".into();
        let a = MatchRecord::from_summary(&member, &summary("m-1"));
        let b = MatchRecord::from_summary(&member, &summary("m-1"));
        let c = MatchRecord::from_summary(&member, &summary("m-2"));
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_match_record_projection_keeps_fields() {
        let member: MemberId = "member-1".into();
        let record = MatchRecord::from_summary(&member, &summary("m-1"));
        let back = record.to_summary();
        assert_eq!(back.match_id, "m-1");
        assert_eq!(back.placement, 3);
        assert_eq!(back.category, MatchCategory::Ranked);
        assert!(back.teammates.is_empty());
    }

    #[test]
    fn test_match_record_missing_category_defaults_normal() {
        let json = r#"{
            "id": "abc",
            "clan_member_id": "m",
            "match_external_id": "x",
            "mode": "solo",
            "map_name": "Miramar",
            "placement": 10,
            "kills": 0,
            "assists": 0,
            "damage": 0.0,
            "survive_time": 100.0,
            "created_at": "2026-01-01T00:00:00Z"
        }"#;
        let record: MatchRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.category, MatchCategory::Normal);
    }

    #[test]
    fn test_mode_stats_line_roundtrip_totals() {
        let member: MemberId = "member-1".into();
        let line = ModeStatLine::from_totals("duo".to_string(), 10, 1, 4, 25, 5, 3, 2500.0, 9000.0);
        let row = ModeStats::from_line(&member, "division.bro.official.pc-2018-30", &line);
        let back = row.to_line();
        assert_eq!(back.kills, 25);
        assert_eq!(back.assists, 5);
        assert!((back.damage_dealt - 2500.0).abs() < 1e-9);
        assert_eq!(back.win_rate, line.win_rate);
    }
}
