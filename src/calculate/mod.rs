//! Statistics calculation engine.
//!
//! Pure read-side transforms over whichever bundle was resolved:
//! - Match-derived aggregates (win rate, top 10 rate, averages)
//! - Playstyle classification and bounded indices
//! - Strength / weakness heuristics
//! - Teammate synergy restricted to the clan roster

pub mod aggregates;
pub mod insights;
pub mod playstyle;
pub mod synergy;

pub use aggregates::*;
pub use insights::*;
pub use playstyle::*;
pub use synergy::*;

/// `part / total` as a percentage; 0 when there is nothing to divide by.
pub fn percentage(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}

/// Per-match average; 0 when no matches were played.
pub fn per_match(total: f64, matches: f64) -> f64 {
    if matches <= 0.0 {
        0.0
    } else {
        total / matches
    }
}

/// Kills per death, where deaths are non-winning rounds.
/// A player who never died reports their kill count.
pub fn kd_ratio(kills: u32, rounds: u32, wins: u32) -> f64 {
    let deaths = rounds.saturating_sub(wins);
    if deaths == 0 {
        kills as f64
    } else {
        kills as f64 / deaths as f64
    }
}

/// Clamp a heuristic index into [0, 100]. NaN collapses to 0.
pub fn clamp_index(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
