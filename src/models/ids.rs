//! Content-derived ids for cached rows.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex id derived from the row's natural key. The same key always yields the
/// same id, so re-provisioning a player lands on the existing row.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

const ID_LEN: usize = 16;

impl EntityId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Hash `parts` joined with `|` and keep the first 16 hex digits.
    pub fn generate(parts: &[&str]) -> Self {
        let digest = Sha256::digest(parts.join("|").as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(ID_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

pub type ClanId = EntityId;
pub type MemberId = EntityId;
pub type MatchId = EntityId;
pub type ModeStatsId = EntityId;
