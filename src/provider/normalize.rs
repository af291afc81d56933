//! Upstream field normalization.
//!
//! The stats feed has reported the same semantic field under several names
//! over time, and ratios both as 0-1 fractions and 0-100 percentages.
//! [`FIELD_ALIASES`] maps every canonical [`Field`] to the names it has been
//! observed under; the first non-null alias wins. Missing or non-numeric
//! values collapse to zero with a `debug!`, never an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::models::{
    ClanInfo, MatchCategory, MatchSummary, ModeStatLine, RankedSummary, Teammate,
};

/// Canonical field names used by the rest of the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Rounds,
    Wins,
    Top10s,
    Kills,
    Assists,
    HeadshotKills,
    DamageDealt,
    TimeSurvived,
    AvgDamage,
    WinRatio,
    Top10Ratio,
    Kda,
    Tier,
    SubTier,
    RankPoint,
    PlayerName,
    PlayerId,
    Placement,
    GameMode,
    MapName,
    MatchType,
    CreatedAt,
    ClanId,
    ClanName,
    ClanTag,
    ClanLevel,
    ClanMemberCount,
}

/// Alias table: canonical field → observed upstream names, in priority order.
/// Dotted names address nested objects.
pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Rounds, &["roundsPlayed", "rounds", "matches", "matchesPlayed"]),
    (Field::Wins, &["wins", "win", "chickenDinners"]),
    (Field::Top10s, &["top10s", "top10", "top10Count"]),
    (Field::Kills, &["kills", "totalKills"]),
    (Field::Assists, &["assists", "totalAssists"]),
    (Field::HeadshotKills, &["headshotKills", "headshots"]),
    (Field::DamageDealt, &["damageDealt", "damage", "totalDamage"]),
    (Field::TimeSurvived, &["timeSurvived", "survivalTime", "surviveTime"]),
    (Field::AvgDamage, &["avgDamage", "averageDamage", "damagePerMatch"]),
    (Field::WinRatio, &["winRatio", "winRate", "winPercentage", "win_rate"]),
    (Field::Top10Ratio, &["top10Ratio", "top10Rate", "top10Percentage", "top10_rate"]),
    (Field::Kda, &["kda", "KDA", "kdRatio"]),
    (Field::Tier, &["currentTier.tier", "tier", "rankTier"]),
    (Field::SubTier, &["currentTier.subTier", "subTier", "rankSubTier"]),
    (Field::RankPoint, &["currentRankPoint", "rankPoint", "rankPoints"]),
    (Field::PlayerName, &["name", "playerName", "nickname"]),
    (Field::PlayerId, &["playerId", "accountId", "account_id"]),
    (Field::Placement, &["winPlace", "rank", "placement"]),
    (Field::GameMode, &["gameMode", "mode"]),
    (Field::MapName, &["mapName", "map"]),
    (Field::MatchType, &["matchType", "type"]),
    (Field::CreatedAt, &["createdAt", "created_at", "playedAt"]),
    (Field::ClanId, &["clanId", "clan_id"]),
    (Field::ClanName, &["clanName", "name"]),
    (Field::ClanTag, &["clanTag", "tag"]),
    (Field::ClanLevel, &["clanLevel", "level"]),
    (Field::ClanMemberCount, &["clanMemberCount", "memberCount", "members"]),
];

/// Internal map names to display names.
const MAP_NAMES: &[(&str, &str)] = &[
    ("Baltic_Main", "Erangel"),
    ("Erangel_Main", "Erangel"),
    ("Desert_Main", "Miramar"),
    ("Savage_Main", "Sanhok"),
    ("DihorOtok_Main", "Vikendi"),
    ("Tiger_Main", "Taego"),
    ("Kiki_Main", "Deston"),
    ("Neon_Main", "Rondo"),
    ("Summerland_Main", "Karakin"),
    ("Chimera_Main", "Paramo"),
    ("Heaven_Main", "Haven"),
    ("Range_Main", "Camp Jackal"),
];

/// Aliases for a canonical field.
pub fn aliases(field: Field) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

fn get_path<'a>(obj: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(obj, |current, key| current.get(key))
}

/// First non-null value among a field's aliases.
pub fn lookup<'a>(obj: &'a Value, field: Field) -> Option<&'a Value> {
    aliases(field)
        .iter()
        .filter_map(|name| get_path(obj, name))
        .find(|value| !value.is_null())
}

fn coerce_number(field: Field, value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => n,
        _ => {
            debug!(?field, %value, "Non-numeric upstream value, defaulting to 0");
            0.0
        }
    }
}

/// Numeric field; absent or non-numeric → 0.
pub fn number(obj: &Value, field: Field) -> f64 {
    lookup(obj, field)
        .map(|value| coerce_number(field, value))
        .unwrap_or(0.0)
}

/// Non-negative integer field.
pub fn count(obj: &Value, field: Field) -> u32 {
    let n = number(obj, field);
    if n <= 0.0 {
        0
    } else {
        n.round().min(u32::MAX as f64) as u32
    }
}

/// Normalize a ratio to a 0-100 percentage.
///
/// The feed sends the same ratio either as a 0-1 fraction or as a 0-100
/// percentage with no unit marker. Values up to 1.0 are read as fractions,
/// so a real percentage of 1% or less comes out 100x too large. Only a
/// string with a trailing `%` (see [`ratio`]) is taken literally.
pub fn to_percentage(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        0.0
    } else if value <= 1.0 {
        value * 100.0
    } else {
        value.min(100.0)
    }
}

/// Ratio field as a percentage. Strings with a trailing `%` are already percentages.
pub fn ratio(obj: &Value, field: Field) -> f64 {
    match lookup(obj, field) {
        Some(Value::String(s)) if s.trim().ends_with('%') => {
            coerce_number(field, &Value::String(s.clone())).clamp(0.0, 100.0)
        }
        Some(value) => to_percentage(coerce_number(field, value)),
        None => 0.0,
    }
}

/// Text field; numbers are stringified, blanks are absent.
pub fn text(obj: &Value, field: Field) -> Option<String> {
    match lookup(obj, field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// RFC 3339 timestamp field.
pub fn timestamp(obj: &Value, field: Field) -> Option<DateTime<Utc>> {
    let raw = text(obj, field)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            debug!(?field, raw, "Unparseable timestamp: {}", e);
            None
        }
    }
}

/// Display name for an internal map name. Unknown maps pass through.
pub fn map_display_name(raw: &str) -> String {
    MAP_NAMES
        .iter()
        .find(|(internal, _)| internal.eq_ignore_ascii_case(raw))
        .map(|(_, display)| display.to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// One mode's season stats object → stat line.
pub fn mode_stat_line(mode: &str, obj: &Value) -> ModeStatLine {
    ModeStatLine::from_totals(
        mode.to_string(),
        count(obj, Field::Rounds),
        count(obj, Field::Wins),
        count(obj, Field::Top10s),
        count(obj, Field::Kills),
        count(obj, Field::Assists),
        count(obj, Field::HeadshotKills),
        number(obj, Field::DamageDealt),
        number(obj, Field::TimeSurvived),
    )
}

/// Every played mode in a `gameModeStats` object. Modes with no rounds are dropped.
pub fn mode_stat_lines(game_mode_stats: &Value) -> BTreeMap<String, ModeStatLine> {
    let Some(modes) = game_mode_stats.as_object() else {
        return BTreeMap::new();
    };
    modes
        .iter()
        .map(|(mode, stats)| (mode.clone(), mode_stat_line(mode, stats)))
        .filter(|(_, line)| line.matches > 0)
        .collect()
}

/// Ranked summary from a `rankedGameModeStats` object.
///
/// The mode with the most rounds is reported. `None` when nothing was played.
pub fn ranked_summary(ranked_mode_stats: &Value) -> Option<RankedSummary> {
    let modes = ranked_mode_stats.as_object()?;
    let (_, stats) = modes
        .iter()
        .filter(|(_, stats)| count(stats, Field::Rounds) > 0)
        .max_by_key(|(_, stats)| count(stats, Field::Rounds))?;

    let rounds_played = count(stats, Field::Rounds);
    let avg_damage = match lookup(stats, Field::AvgDamage) {
        Some(_) => number(stats, Field::AvgDamage),
        None => crate::calculate::per_match(number(stats, Field::DamageDealt), rounds_played as f64),
    };

    Some(RankedSummary {
        tier: text(stats, Field::Tier).unwrap_or_else(|| RankedSummary::UNRANKED.to_string()),
        sub_tier: text(stats, Field::SubTier),
        rank_point: number(stats, Field::RankPoint),
        rounds_played,
        wins: count(stats, Field::Wins),
        win_rate: ratio(stats, Field::WinRatio),
        top10_rate: ratio(stats, Field::Top10Ratio),
        kda: number(stats, Field::Kda),
        avg_damage,
    })
}

/// Clan attributes → clan info.
pub fn clan_info(external_clan_id: Option<String>, attributes: &Value) -> Option<ClanInfo> {
    let name = text(attributes, Field::ClanName)?;
    let member_count = lookup(attributes, Field::ClanMemberCount)
        .map(|_| count(attributes, Field::ClanMemberCount));
    let level = lookup(attributes, Field::ClanLevel).map(|_| count(attributes, Field::ClanLevel));
    Some(ClanInfo {
        external_clan_id,
        name,
        tag: text(attributes, Field::ClanTag),
        level,
        member_count,
    })
}

fn included_of_type<'a>(doc: &'a Value, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    doc.get("included")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |item| item.get("type").and_then(Value::as_str) == Some(kind))
}

fn participant_stats(participant: &Value) -> &Value {
    participant
        .pointer("/attributes/stats")
        .unwrap_or(&Value::Null)
}

/// Parse a match document from the player's perspective.
///
/// The player is located by account id, falling back to a case-insensitive
/// name match. `None` when the player is not in the document.
pub fn parse_match(doc: &Value, account_id: Option<&str>, nickname: &str) -> Option<MatchSummary> {
    let data = doc.get("data")?;
    let match_id = data.get("id").and_then(Value::as_str)?.to_string();
    let attributes = data.get("attributes").unwrap_or(&Value::Null);

    let participants: Vec<&Value> = included_of_type(doc, "participant").collect();
    let me = participants.iter().copied().find(|p| {
        let stats = participant_stats(p);
        match (account_id, text(stats, Field::PlayerId)) {
            (Some(wanted), Some(found)) => wanted == found,
            _ => text(stats, Field::PlayerName)
                .map(|name| name.eq_ignore_ascii_case(nickname))
                .unwrap_or(false),
        }
    })?;
    let me_id = me.get("id").and_then(Value::as_str).unwrap_or_default();
    let stats = participant_stats(me);

    let roster = included_of_type(doc, "roster").find(|roster| {
        roster
            .pointer("/relationships/participants/data")
            .and_then(Value::as_array)
            .map(|refs| {
                refs.iter()
                    .any(|r| r.get("id").and_then(Value::as_str) == Some(me_id))
            })
            .unwrap_or(false)
    });

    let teammates = roster
        .and_then(|roster| roster.pointer("/relationships/participants/data"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|r| r.get("id").and_then(Value::as_str))
        .filter_map(|id| {
            participants
                .iter()
                .find(|p| p.get("id").and_then(Value::as_str) == Some(id))
        })
        .filter_map(|p| {
            let stats = participant_stats(p);
            Some(Teammate {
                name: text(stats, Field::PlayerName)?,
                account_id: text(stats, Field::PlayerId),
                kills: count(stats, Field::Kills),
                assists: count(stats, Field::Assists),
                damage: number(stats, Field::DamageDealt),
            })
        })
        .collect();

    let mut placement = count(stats, Field::Placement);
    if placement == 0 {
        if let Some(roster) = roster {
            placement = count(
                roster.pointer("/attributes/stats").unwrap_or(&Value::Null),
                Field::Placement,
            );
        }
    }

    Some(MatchSummary {
        match_id,
        mode: text(attributes, Field::GameMode).unwrap_or_else(|| "unknown".to_string()),
        map_name: map_display_name(&text(attributes, Field::MapName).unwrap_or_default()),
        category: MatchCategory::from_match_type(
            &text(attributes, Field::MatchType).unwrap_or_default(),
        ),
        placement,
        kills: count(stats, Field::Kills),
        assists: count(stats, Field::Assists),
        damage: number(stats, Field::DamageDealt),
        survive_time: number(stats, Field::TimeSurvived),
        headshot_kills: count(stats, Field::HeadshotKills),
        created_at: timestamp(attributes, Field::CreatedAt).unwrap_or_else(Utc::now),
        teammates,
    })
}
