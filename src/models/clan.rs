//! Clan and clan member records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClanId, EntityId, MemberId, PlayStyle, Shard};

/// Key reserved for the sentinel clan grouping players without a real clan.
pub const UNAFFILIATED_CLAN_KEY: &str = "__unaffiliated__";

/// Display name of the sentinel clan.
pub const UNAFFILIATED_CLAN_NAME: &str = "Unaffiliated";

/// A clan known to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clan {
    /// Unique identifier (derived from the external clan id)
    pub id: ClanId,

    /// Clan name
    pub name: String,

    /// Provider-side clan id; the dedup key. Absent on legacy rows and the sentinel.
    pub external_clan_id: Option<String>,

    /// Clan tag
    pub tag: Option<String>,

    /// Clan level
    pub level: Option<u32>,

    /// Number of cached members
    pub member_count: u32,

    /// When this record was created
    pub created_at: DateTime<Utc>,

    /// When this record was last written
    pub updated_at: DateTime<Utc>,
}

impl Clan {
    /// Create a clan keyed by its provider id.
    pub fn new(external_clan_id: String, name: String) -> Self {
        let id = EntityId::generate(&["clan", &external_clan_id]);
        let now = Utc::now();
        Self {
            id,
            name,
            external_clan_id: Some(external_clan_id),
            tag: None,
            level: None,
            member_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a clan known only by name.
    pub fn named(name: String) -> Self {
        let id = EntityId::generate(&["clan-name", &name.to_lowercase()]);
        let now = Utc::now();
        Self {
            id,
            name,
            external_clan_id: None,
            tag: None,
            level: None,
            member_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The sentinel "unaffiliated" clan. Its id is fixed.
    pub fn unaffiliated() -> Self {
        let now = Utc::now();
        Self {
            id: Self::unaffiliated_id(),
            name: UNAFFILIATED_CLAN_NAME.to_string(),
            external_clan_id: None,
            tag: None,
            level: None,
            member_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn unaffiliated_id() -> ClanId {
        EntityId::generate(&["clan", UNAFFILIATED_CLAN_KEY])
    }

    pub fn is_unaffiliated(&self) -> bool {
        self.id == Self::unaffiliated_id()
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_level(mut self, level: Option<u32>) -> Self {
        self.level = level;
        self
    }
}

/// A cached player, always attached to exactly one clan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClanMember {
    /// Unique identifier (derived from shard + nickname + clan)
    pub id: MemberId,

    pub nickname: String,

    pub clan_id: ClanId,

    /// Provider account id (e.g. "account.abc123")
    pub external_player_id: Option<String>,

    pub shard: Shard,

    pub avg_damage: f64,
    pub avg_kills: f64,
    pub avg_assists: f64,

    /// Average survival time in seconds
    pub avg_survive_time: f64,

    /// Win rate as a percentage (0-100)
    pub win_rate: f64,

    /// Top 10 rate as a percentage (0-100)
    pub top10_rate: f64,

    /// Composite ranking score within the clan
    pub score: f64,

    /// Classifier label from the last reconciliation
    pub style: Option<PlayStyle>,

    /// When live data was last written to this row
    pub last_updated: Option<DateTime<Utc>>,

    /// When this record was created
    pub created_at: DateTime<Utc>,
}

impl ClanMember {
    /// Create an empty member row awaiting its first reconciliation.
    pub fn new(shard: Shard, nickname: String, clan_id: ClanId) -> Self {
        let id = Self::id_for(shard, &nickname, &clan_id);
        Self {
            id,
            nickname,
            clan_id,
            external_player_id: None,
            shard,
            avg_damage: 0.0,
            avg_kills: 0.0,
            avg_assists: 0.0,
            avg_survive_time: 0.0,
            win_rate: 0.0,
            top10_rate: 0.0,
            score: 0.0,
            style: None,
            last_updated: None,
            created_at: Utc::now(),
        }
    }

    /// Member ids are stable for a (shard, nickname, clan) triple. Nicknames compare case-insensitively.
    pub fn id_for(shard: Shard, nickname: &str, clan_id: &ClanId) -> MemberId {
        EntityId::generate(&[
            "member",
            shard.as_str(),
            &nickname.to_lowercase(),
            clan_id.as_str(),
        ])
    }

    pub fn with_external_player_id(mut self, account_id: Option<String>) -> Self {
        self.external_player_id = account_id;
        self
    }

    /// Whether this row is the same player as `nickname` on `shard`.
    pub fn matches_nickname(&self, shard: Shard, nickname: &str) -> bool {
        self.shard == shard && self.nickname.eq_ignore_ascii_case(nickname)
    }
}
