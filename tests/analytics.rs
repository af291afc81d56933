use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use clan_tracker::calculate::{
    aggregate_synergy, analyze, classify, MatchAggregates, PlaystyleInput, SynergyStatus,
};
use clan_tracker::models::{MatchCategory, MatchSummary, PlayStyle, Teammate};

fn mate(name: &str) -> Teammate {
    Teammate {
        name: name.to_string(),
        account_id: None,
        kills: 2,
        assists: 1,
        damage: 250.0,
    }
}

fn game(id: &str, placement: u32, teammates: Vec<Teammate>) -> MatchSummary {
    MatchSummary {
        match_id: id.to_string(),
        mode: "duo".to_string(),
        map_name: "Sanhok".to_string(),
        category: MatchCategory::Ranked,
        placement,
        kills: 2,
        assists: 1,
        damage: 250.0,
        survive_time: 800.0,
        headshot_kills: 0,
        created_at: Utc.with_ymd_and_hms(2026, 2, 14, 20, 0, 0).unwrap(),
        teammates,
    }
}

#[test]
fn test_reference_profile_is_aggressive() {
    let input = PlaystyleInput {
        avg_kills: 3.2,
        avg_damage: 450.0,
        avg_survival_time: 900.0,
        win_rate: 18.0,
        top10_rate: 40.0,
        kd: 1.8,
        ..Default::default()
    };

    let classification = classify(&input);
    assert_eq!(classification.play_style, PlayStyle::Aggressive);
    assert_eq!(classification.indices.aggression, 100.0);

    let analysis = analyze(&input);
    assert_eq!(analysis.play_style, PlayStyle::Aggressive);
}

#[test]
fn test_zero_matches_have_zero_rates() {
    let aggregates = MatchAggregates::from_matches(&[]);
    assert_eq!(aggregates.total_matches, 0);
    assert_eq!(aggregates.win_rate, 0.0);
    assert_eq!(aggregates.top10_rate, 0.0);

    let summary = aggregates.to_summary();
    assert!(summary.kd.is_finite());
    assert_eq!(
        classify(&PlaystyleInput::from(&summary)).play_style,
        PlayStyle::Balanced
    );
}

#[test]
fn test_synergy_keeps_only_clan_mates() {
    let matches = vec![game(
        "m1",
        2,
        vec![mate("Self"), mate("ClanMemberA"), mate("StrangerB")],
    )];
    let roster = vec!["Self".to_string(), "ClanMemberA".to_string()];

    let report = aggregate_synergy(&matches, &roster, "self");
    assert_eq!(report.status, SynergyStatus::Ok);
    let names: Vec<&str> = report.teammates.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["ClanMemberA"]);
}

#[test]
fn test_empty_roster_differs_from_no_shared_matches() {
    let matches = vec![game("m1", 4, vec![mate("Self"), mate("StrangerB")])];

    let unaffiliated = aggregate_synergy(&matches, &[], "Self");
    assert_eq!(unaffiliated.status, SynergyStatus::NotAffiliated);
    assert!(unaffiliated.teammates.is_empty());

    let roster = vec!["Self".to_string(), "ClanMemberA".to_string()];
    let no_shared = aggregate_synergy(&matches, &roster, "Self");
    assert_eq!(no_shared.status, SynergyStatus::NoSharedMatches);
    assert!(no_shared.teammates.is_empty());
    assert_ne!(unaffiliated.status, no_shared.status);
}
