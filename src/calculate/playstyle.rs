//! Playstyle classification.
//!
//! Three bounded indices are derived from aggregate stats, then the first
//! matching rule assigns the label:
//!
//! 1. aggression >= 70 and avg kills >= 2.5 → Aggressive
//! 2. survival >= 75 and avg survival >= 1200s → Passive
//! 3. avg damage >= 300 and avg kills >= 1.5 → Sniper
//! 4. avg assists >= 1.0 and top 10 rate >= 20% → Support
//! 5. otherwise → Balanced

use serde::{Deserialize, Serialize};

use crate::models::{PlayStyle, StatsSummary};

use super::clamp_index;

/// The stats the heuristics look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaystyleInput {
    pub avg_kills: f64,
    pub avg_damage: f64,
    pub avg_assists: f64,

    /// Seconds
    pub avg_survival_time: f64,

    /// Percentage (0-100)
    pub win_rate: f64,

    /// Percentage (0-100)
    pub top10_rate: f64,

    pub kd: f64,

    /// Percentage (0-100)
    pub headshot_rate: f64,

    pub total_matches: u32,
}

impl From<&StatsSummary> for PlaystyleInput {
    fn from(summary: &StatsSummary) -> Self {
        Self {
            avg_kills: summary.avg_kills,
            avg_damage: summary.avg_damage,
            avg_assists: summary.avg_assists,
            avg_survival_time: summary.avg_survival_time,
            win_rate: summary.win_rate,
            top10_rate: summary.top10_rate,
            kd: summary.kd,
            headshot_rate: summary.headshot_rate,
            total_matches: summary.total_matches,
        }
    }
}

/// Bounded [0, 100] indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaystyleIndices {
    pub aggression: f64,
    pub survival: f64,
    pub consistency: f64,
}

impl PlaystyleIndices {
    pub fn compute(input: &PlaystyleInput) -> Self {
        let aggression = input.avg_kills * 15.0 + input.avg_damage / 10.0 + input.kd * 10.0
            - input.avg_survival_time / 100.0;
        let survival =
            input.avg_survival_time / 20.0 + input.top10_rate * 2.0 + input.win_rate * 3.0;
        let consistency = input.headshot_rate * 2.0
            + input.kd * 15.0
            + input.total_matches.min(10) as f64 * 2.0;

        Self {
            aggression: clamp_index(aggression),
            survival: clamp_index(survival),
            consistency: clamp_index(consistency),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub play_style: PlayStyle,
    pub indices: PlaystyleIndices,
}

const AGGRESSIVE_MIN_INDEX: f64 = 70.0;
const AGGRESSIVE_MIN_KILLS: f64 = 2.5;
const PASSIVE_MIN_INDEX: f64 = 75.0;
const PASSIVE_MIN_SURVIVAL_SECS: f64 = 1200.0;
const SNIPER_MIN_DAMAGE: f64 = 300.0;
const SNIPER_MIN_KILLS: f64 = 1.5;
const SUPPORT_MIN_ASSISTS: f64 = 1.0;
const SUPPORT_MIN_TOP10_RATE: f64 = 20.0;

/// Classify a player. Rules are evaluated in a fixed order; the first hit wins.
pub fn classify(input: &PlaystyleInput) -> Classification {
    let indices = PlaystyleIndices::compute(input);

    let play_style = if indices.aggression >= AGGRESSIVE_MIN_INDEX
        && input.avg_kills >= AGGRESSIVE_MIN_KILLS
    {
        PlayStyle::Aggressive
    } else if indices.survival >= PASSIVE_MIN_INDEX
        && input.avg_survival_time >= PASSIVE_MIN_SURVIVAL_SECS
    {
        PlayStyle::Passive
    } else if input.avg_damage >= SNIPER_MIN_DAMAGE && input.avg_kills >= SNIPER_MIN_KILLS {
        PlayStyle::Sniper
    } else if input.avg_assists >= SUPPORT_MIN_ASSISTS
        && input.top10_rate >= SUPPORT_MIN_TOP10_RATE
    {
        PlayStyle::Support
    } else {
        PlayStyle::Balanced
    };

    Classification {
        play_style,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggressive_example() {
        let input = PlaystyleInput {
            avg_kills: 3.2,
            avg_damage: 450.0,
            avg_survival_time: 900.0,
            win_rate: 18.0,
            top10_rate: 40.0,
            kd: 1.8,
            ..Default::default()
        };
        let result = classify(&input);

        // 3.2*15 + 45 + 18 - 9 = 102, clamped
        assert_eq!(result.indices.aggression, 100.0);
        assert_eq!(result.play_style, PlayStyle::Aggressive);
    }

    #[test]
    fn test_passive_needs_long_survival() {
        let input = PlaystyleInput {
            avg_kills: 1.0,
            avg_damage: 150.0,
            avg_survival_time: 1500.0,
            top10_rate: 45.0,
            win_rate: 5.0,
            kd: 1.0,
            ..Default::default()
        };
        let result = classify(&input);
        // 75 + 90 + 15, clamped
        assert_eq!(result.indices.survival, 100.0);
        assert_eq!(result.play_style, PlayStyle::Passive);

        let short = PlaystyleInput {
            avg_survival_time: 1100.0,
            ..input
        };
        assert_ne!(classify(&short).play_style, PlayStyle::Passive);
    }

    #[test]
    fn test_sniper() {
        let input = PlaystyleInput {
            avg_kills: 1.8,
            avg_damage: 320.0,
            avg_survival_time: 700.0,
            top10_rate: 10.0,
            kd: 1.2,
            ..Default::default()
        };
        // aggression = 27 + 32 + 12 - 7 = 64
        let result = classify(&input);
        assert!((result.indices.aggression - 64.0).abs() < 1e-9);
        assert_eq!(result.play_style, PlayStyle::Sniper);
    }

    #[test]
    fn test_support() {
        let input = PlaystyleInput {
            avg_kills: 0.8,
            avg_damage: 140.0,
            avg_assists: 1.2,
            avg_survival_time: 800.0,
            top10_rate: 25.0,
            kd: 0.9,
            ..Default::default()
        };
        assert_eq!(classify(&input).play_style, PlayStyle::Support);
    }

    #[test]
    fn test_balanced_fallback() {
        let input = PlaystyleInput::default();
        let result = classify(&input);
        assert_eq!(result.play_style, PlayStyle::Balanced);
        assert_eq!(result.indices, PlaystyleIndices::default());
    }

    #[test]
    fn test_rule_order_aggressive_beats_sniper() {
        // Satisfies both rule 1 and rule 3.
        let input = PlaystyleInput {
            avg_kills: 3.0,
            avg_damage: 400.0,
            kd: 2.0,
            ..Default::default()
        };
        assert_eq!(classify(&input).play_style, PlayStyle::Aggressive);
    }

    #[test]
    fn test_consistency_caps_match_contribution() {
        let few = PlaystyleInput {
            total_matches: 3,
            ..Default::default()
        };
        let many = PlaystyleInput {
            total_matches: 500,
            ..Default::default()
        };
        assert_eq!(PlaystyleIndices::compute(&few).consistency, 6.0);
        assert_eq!(PlaystyleIndices::compute(&many).consistency, 20.0);
    }

    #[test]
    fn test_indices_never_negative() {
        let input = PlaystyleInput {
            avg_survival_time: 5000.0,
            ..Default::default()
        };
        assert_eq!(PlaystyleIndices::compute(&input).aggression, 0.0);
    }

    #[test]
    fn test_input_from_summary() {
        let summary = StatsSummary {
            avg_kills: 2.0,
            kd: 1.5,
            total_matches: 12,
            ..Default::default()
        };
        let input = PlaystyleInput::from(&summary);
        assert_eq!(input.avg_kills, 2.0);
        assert_eq!(input.kd, 1.5);
        assert_eq!(input.total_matches, 12);
    }
}
