//! Platform shards accepted by the stats provider.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform partition a lookup is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shard {
    Steam,
    Kakao,
    Psn,
    Xbox,
    Console,
}

impl Shard {
    pub const ALL: [Shard; 5] = [
        Shard::Steam,
        Shard::Kakao,
        Shard::Psn,
        Shard::Xbox,
        Shard::Console,
    ];

    /// Path segment used by the provider API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Shard::Steam => "steam",
            Shard::Kakao => "kakao",
            Shard::Psn => "psn",
            Shard::Xbox => "xbox",
            Shard::Console => "console",
        }
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown shard: {0} (expected one of steam, kakao, psn, xbox, console)")]
pub struct ShardParseError(pub String);

impl FromStr for Shard {
    type Err = ShardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Shard::ALL
            .into_iter()
            .find(|shard| shard.as_str() == wanted)
            .ok_or_else(|| ShardParseError(s.to_string()))
    }
}

/// Whether a nickname is acceptable as a lookup key.
///
/// Invalid nicknames are rejected before any cache or provider access.
pub fn is_valid_nickname(nickname: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{2,32}$").expect("nickname pattern is valid"))
        .is_match(nickname)
}
