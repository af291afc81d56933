//! Playstyle labels.

use serde::{Deserialize, Serialize};

/// Categorical playstyle assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayStyle {
    Aggressive,
    Passive,
    Sniper,
    Support,
    Balanced,
}

impl PlayStyle {
    /// Short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            PlayStyle::Aggressive => "Aggressive",
            PlayStyle::Passive => "Passive",
            PlayStyle::Sniper => "Sniper",
            PlayStyle::Support => "Support",
            PlayStyle::Balanced => "Balanced",
        }
    }
}

impl std::fmt::Display for PlayStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
