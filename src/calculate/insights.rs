//! Strength and weakness heuristics.
//!
//! Each list is produced by walking a fixed, ordered battery of threshold
//! checks. Strengths stop at 4, weaknesses at 3, and a list that would be
//! empty gets a single fallback entry.

use serde::{Deserialize, Serialize};

use crate::models::PlayStyle;

use super::playstyle::{classify, PlaystyleIndices, PlaystyleInput};
use super::clamp_index;

pub const MAX_STRENGTHS: usize = 4;
pub const MAX_WEAKNESSES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strength {
    pub title: String,
    /// 0-100
    pub score: f64,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weakness {
    pub title: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

/// Everything the analytics engine derives for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAnalysis {
    pub play_style: PlayStyle,
    pub indices: PlaystyleIndices,
    pub strengths: Vec<Strength>,
    pub weaknesses: Vec<Weakness>,
}

struct StrengthCheck {
    title: &'static str,
    applies: fn(&PlaystyleInput) -> bool,
    score: fn(&PlaystyleInput) -> f64,
    describe: fn(&PlaystyleInput) -> String,
    recommendation: &'static str,
}

struct WeaknessCheck {
    title: &'static str,
    applies: fn(&PlaystyleInput) -> bool,
    severity: fn(&PlaystyleInput) -> Severity,
    describe: fn(&PlaystyleInput) -> String,
    recommendation: &'static str,
}

const STRENGTH_CHECKS: &[StrengthCheck] = &[
    StrengthCheck {
        title: "High damage output",
        applies: |s| s.avg_damage >= 300.0,
        score: |s| s.avg_damage / 5.0,
        describe: |s| format!("Averaging {:.0} damage per match", s.avg_damage),
        recommendation: "Convert pressure into finishes by pushing knocked enemies with your squad.",
    },
    StrengthCheck {
        title: "Strong K/D",
        applies: |s| s.kd >= 2.0,
        score: |s| s.kd * 25.0,
        describe: |s| format!("{:.2} kills per death", s.kd),
        recommendation: "Take the lead on entry fights; your trades usually pay off.",
    },
    StrengthCheck {
        title: "Closes out games",
        applies: |s| s.win_rate >= 10.0,
        score: |s| s.win_rate * 5.0,
        describe: |s| format!("Wins {:.1}% of matches", s.win_rate),
        recommendation: "Keep your late-circle positioning; it is already winning games.",
    },
    StrengthCheck {
        title: "Reliable top 10",
        applies: |s| s.top10_rate >= 40.0,
        score: |s| s.top10_rate * 1.5,
        describe: |s| format!("Reaches the top 10 in {:.1}% of matches", s.top10_rate),
        recommendation: "Use your consistent placements to take more fights in the final circles.",
    },
    StrengthCheck {
        title: "Long survival",
        applies: |s| s.avg_survival_time >= 1200.0,
        score: |s| s.avg_survival_time / 20.0,
        describe: |s| format!("Survives {:.0} minutes on average", s.avg_survival_time / 60.0),
        recommendation: "Rotate early and keep using cover; survival is your edge.",
    },
    StrengthCheck {
        title: "Precise aim",
        applies: |s| s.headshot_rate >= 30.0,
        score: |s| s.headshot_rate * 2.0,
        describe: |s| format!("{:.1}% of kills are headshots", s.headshot_rate),
        recommendation: "Favour DMRs and long-range engagements that reward accuracy.",
    },
    StrengthCheck {
        title: "Team player",
        applies: |s| s.avg_assists >= 1.0,
        score: |s| s.avg_assists * 50.0,
        describe: |s| format!("{:.1} assists per match", s.avg_assists),
        recommendation: "Call targets for your squad; your support play sets up their kills.",
    },
];

const WEAKNESS_CHECKS: &[WeaknessCheck] = &[
    WeaknessCheck {
        title: "Low damage output",
        applies: |s| s.avg_damage < 150.0,
        severity: |s| {
            if s.avg_damage < 100.0 {
                Severity::High
            } else {
                Severity::Medium
            }
        },
        describe: |s| format!("Only {:.0} damage per match", s.avg_damage),
        recommendation: "Take more mid-range fights and follow up on teammates' knocks.",
    },
    WeaknessCheck {
        title: "Losing gunfights",
        applies: |s| s.kd < 1.0,
        severity: |s| {
            if s.kd < 0.5 {
                Severity::High
            } else {
                Severity::Medium
            }
        },
        describe: |s| format!("{:.2} kills per death", s.kd),
        recommendation: "Practise recoil control and only peek with a cover advantage.",
    },
    WeaknessCheck {
        title: "Early eliminations",
        applies: |s| s.top10_rate < 20.0,
        severity: |s| {
            if s.top10_rate < 10.0 {
                Severity::High
            } else {
                Severity::Medium
            }
        },
        describe: |s| format!("Top 10 in only {:.1}% of matches", s.top10_rate),
        recommendation: "Avoid hot drops and rotate ahead of the zone.",
    },
    WeaknessCheck {
        title: "Short survival",
        applies: |s| s.avg_survival_time < 600.0,
        severity: |_| Severity::Medium,
        describe: |s| format!("Survives {:.0} seconds on average", s.avg_survival_time),
        recommendation: "Loot safer areas early and pick fights you can disengage from.",
    },
    WeaknessCheck {
        title: "Aim accuracy",
        applies: |s| s.avg_kills > 0.0 && s.headshot_rate < 10.0,
        severity: |_| Severity::Low,
        describe: |s| format!("{:.1}% headshot rate", s.headshot_rate),
        recommendation: "Spend time in the training range tracking head-height targets.",
    },
    WeaknessCheck {
        title: "Limited team play",
        applies: |s| s.avg_assists < 0.3,
        severity: |_| Severity::Low,
        describe: |s| format!("{:.2} assists per match", s.avg_assists),
        recommendation: "Stay closer to your squad and trade fights together.",
    },
];

/// Strengths in battery order, capped at [`MAX_STRENGTHS`]. Never empty.
pub fn strengths(input: &PlaystyleInput) -> Vec<Strength> {
    let mut found: Vec<Strength> = STRENGTH_CHECKS
        .iter()
        .filter(|check| (check.applies)(input))
        .take(MAX_STRENGTHS)
        .map(|check| Strength {
            title: check.title.to_string(),
            score: clamp_index((check.score)(input)).round(),
            description: (check.describe)(input),
            recommendation: check.recommendation.to_string(),
        })
        .collect();

    if found.is_empty() {
        found.push(Strength {
            title: "Building experience".to_string(),
            score: 0.0,
            description: "No standout stat yet".to_string(),
            recommendation: "Keep playing; strengths show up after a few more matches.".to_string(),
        });
    }
    found
}

/// Weaknesses in battery order, capped at [`MAX_WEAKNESSES`]. Never empty.
pub fn weaknesses(input: &PlaystyleInput) -> Vec<Weakness> {
    let mut found: Vec<Weakness> = WEAKNESS_CHECKS
        .iter()
        .filter(|check| (check.applies)(input))
        .take(MAX_WEAKNESSES)
        .map(|check| Weakness {
            title: check.title.to_string(),
            severity: (check.severity)(input),
            description: (check.describe)(input),
            recommendation: check.recommendation.to_string(),
        })
        .collect();

    if found.is_empty() {
        found.push(Weakness {
            title: "No major weaknesses".to_string(),
            severity: Severity::Low,
            description: "Every tracked stat is above its threshold".to_string(),
            recommendation: "Maintain current form.".to_string(),
        });
    }
    found
}

/// Run the classifier and both batteries.
pub fn analyze(input: &PlaystyleInput) -> PlayerAnalysis {
    let classification = classify(input);
    PlayerAnalysis {
        play_style: classification.play_style,
        indices: classification.indices,
        strengths: strengths(input),
        weaknesses: weaknesses(input),
    }
}
