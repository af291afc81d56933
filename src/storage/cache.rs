//! Cache store repository.
//!
//! The store is shared mutable state with last-writer-wins semantics. The
//! JSONL implementation serialises writers per store through one lock and
//! rewrites a table file on every mutation.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::{
    Clan, ClanId, ClanMember, MatchRecord, MemberId, ModeStats, Shard, MATCH_WINDOW,
};

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError, Table};

/// Outcome of an insert guarded by a unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum Inserted<T> {
    Created(T),
    /// A row with the same key already existed; it is returned untouched.
    Existing(T),
}

impl<T> Inserted<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Inserted::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Inserted::Created(row) | Inserted::Existing(row) => row,
        }
    }
}

/// Repository over clans, members and their match / mode-stats windows.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Find a member by nickname (case-insensitive) on a shard.
    async fn find_member(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<Option<ClanMember>, StorageError>;

    async fn member(&self, id: &MemberId) -> Result<Option<ClanMember>, StorageError>;

    async fn clan_members(&self, clan_id: &ClanId) -> Result<Vec<ClanMember>, StorageError>;

    /// Insert or overwrite a member by id.
    async fn upsert_member(&self, member: ClanMember) -> Result<(), StorageError>;

    /// Insert unless a member with the same (shard, nickname, clan) exists.
    /// The existence check and the insert happen under one write lock.
    async fn insert_member_if_absent(
        &self,
        member: ClanMember,
    ) -> Result<Inserted<ClanMember>, StorageError>;

    async fn clan(&self, id: &ClanId) -> Result<Option<Clan>, StorageError>;

    async fn find_clan_by_external_id(
        &self,
        external_clan_id: &str,
    ) -> Result<Option<Clan>, StorageError>;

    /// Case-insensitive name match, for legacy rows without an external id.
    async fn find_clan_by_name(&self, name: &str) -> Result<Option<Clan>, StorageError>;

    /// Insert or overwrite a clan by id.
    async fn upsert_clan(&self, clan: Clan) -> Result<(), StorageError>;

    /// Insert unless a clan with the same id or external id exists.
    async fn insert_clan_if_absent(&self, clan: Clan) -> Result<Inserted<Clan>, StorageError>;

    /// Recount the clan's members and store the count on the current clan
    /// row. Counting and writing happen under one write lock. None if the
    /// clan does not exist.
    async fn refresh_member_count(&self, clan_id: &ClanId) -> Result<Option<Clan>, StorageError>;

    /// Persisted match window, most recent first.
    async fn matches(&self, member_id: &MemberId) -> Result<Vec<MatchRecord>, StorageError>;

    /// Replace the member's whole match window. Keeps at most [`MATCH_WINDOW`] rows
    /// in the given order; duplicate ids keep their first occurrence.
    async fn replace_matches(
        &self,
        member_id: &MemberId,
        matches: Vec<MatchRecord>,
    ) -> Result<usize, StorageError>;

    async fn mode_stats(&self, member_id: &MemberId) -> Result<Vec<ModeStats>, StorageError>;

    /// Replace every mode-stats row of the member.
    async fn replace_mode_stats(
        &self,
        member_id: &MemberId,
        stats: Vec<ModeStats>,
    ) -> Result<usize, StorageError>;
}

#[derive(Debug, Default)]
struct Tables {
    clans: Vec<Clan>,
    members: Vec<ClanMember>,
    matches: Vec<MatchRecord>,
    mode_stats: Vec<ModeStats>,
}

/// JSONL-backed cache store. Tables are held in memory and written through.
pub struct JsonlCacheStore {
    config: StorageConfig,
    tables: RwLock<Tables>,
}

impl JsonlCacheStore {
    /// Open the cache in `config.data_dir`, loading any existing tables.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let tables = Tables {
            clans: JsonlReader::for_table(&config, Table::Clans).read_all()?,
            members: JsonlReader::for_table(&config, Table::ClanMembers).read_all()?,
            matches: JsonlReader::for_table(&config, Table::Matches).read_all()?,
            mode_stats: JsonlReader::for_table(&config, Table::ModeStats).read_all()?,
        };

        info!(
            "Opened cache at {:?}: {} clans, {} members, {} matches, {} mode stats",
            config.cache_dir(),
            tables.clans.len(),
            tables.members.len(),
            tables.matches.len(),
            tables.mode_stats.len()
        );

        Ok(Self {
            config,
            tables: RwLock::new(tables),
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn persist<T: Serialize>(&self, table: Table, rows: &[T]) -> Result<(), StorageError> {
        JsonlWriter::for_table(&self.config, table).write_all(rows)?;
        Ok(())
    }
}

fn upsert_by<T: Clone, F>(rows: &[T], row: T, same: F) -> Vec<T>
where
    F: Fn(&T) -> bool,
{
    let mut next: Vec<T> = rows.to_vec();
    match next.iter_mut().find(|existing| same(existing)) {
        Some(slot) => *slot = row,
        None => next.push(row),
    }
    next
}

#[async_trait]
impl CacheStore for JsonlCacheStore {
    async fn find_member(
        &self,
        shard: Shard,
        nickname: &str,
    ) -> Result<Option<ClanMember>, StorageError> {
        let tables = self.tables.read().await;
        // Most recently refreshed row wins if a player appears under several clans.
        Ok(tables
            .members
            .iter()
            .filter(|m| m.matches_nickname(shard, nickname))
            .max_by_key(|m| m.last_updated.unwrap_or(m.created_at))
            .cloned())
    }

    async fn member(&self, id: &MemberId) -> Result<Option<ClanMember>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.members.iter().find(|m| &m.id == id).cloned())
    }

    async fn clan_members(&self, clan_id: &ClanId) -> Result<Vec<ClanMember>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .filter(|m| &m.clan_id == clan_id)
            .cloned()
            .collect())
    }

    async fn upsert_member(&self, member: ClanMember) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let id = member.id.clone();
        let next = upsert_by(&tables.members, member, |m| m.id == id);
        self.persist(Table::ClanMembers, &next)?;
        tables.members = next;
        debug!(member_id = %id, "Upserted member");
        Ok(())
    }

    async fn insert_member_if_absent(
        &self,
        member: ClanMember,
    ) -> Result<Inserted<ClanMember>, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.members.iter().find(|m| {
            m.id == member.id
                || (m.clan_id == member.clan_id && m.matches_nickname(member.shard, &member.nickname))
        }) {
            return Ok(Inserted::Existing(existing.clone()));
        }

        let mut next = tables.members.clone();
        next.push(member.clone());
        self.persist(Table::ClanMembers, &next)?;
        tables.members = next;
        info!(member_id = %member.id, nickname = %member.nickname, "Created member");
        Ok(Inserted::Created(member))
    }

    async fn clan(&self, id: &ClanId) -> Result<Option<Clan>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.clans.iter().find(|c| &c.id == id).cloned())
    }

    async fn find_clan_by_external_id(
        &self,
        external_clan_id: &str,
    ) -> Result<Option<Clan>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .clans
            .iter()
            .find(|c| c.external_clan_id.as_deref() == Some(external_clan_id))
            .cloned())
    }

    async fn find_clan_by_name(&self, name: &str) -> Result<Option<Clan>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .clans
            .iter()
            .find(|c| !c.is_unaffiliated() && c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn upsert_clan(&self, mut clan: Clan) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        clan.updated_at = Utc::now();
        let id = clan.id.clone();
        let next = upsert_by(&tables.clans, clan, |c| c.id == id);
        self.persist(Table::Clans, &next)?;
        tables.clans = next;
        debug!(clan_id = %id, "Upserted clan");
        Ok(())
    }

    async fn insert_clan_if_absent(&self, clan: Clan) -> Result<Inserted<Clan>, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.clans.iter().find(|c| {
            c.id == clan.id
                || (clan.external_clan_id.is_some() && c.external_clan_id == clan.external_clan_id)
        }) {
            return Ok(Inserted::Existing(existing.clone()));
        }

        let mut next = tables.clans.clone();
        next.push(clan.clone());
        self.persist(Table::Clans, &next)?;
        tables.clans = next;
        info!(clan_id = %clan.id, name = %clan.name, "Created clan");
        Ok(Inserted::Created(clan))
    }

    async fn refresh_member_count(&self, clan_id: &ClanId) -> Result<Option<Clan>, StorageError> {
        let mut tables = self.tables.write().await;
        let count = tables.members.iter().filter(|m| &m.clan_id == clan_id).count() as u32;

        let mut next = tables.clans.clone();
        let Some(clan) = next.iter_mut().find(|c| &c.id == clan_id) else {
            return Ok(None);
        };
        clan.member_count = count;
        clan.updated_at = Utc::now();
        let refreshed = clan.clone();

        self.persist(Table::Clans, &next)?;
        tables.clans = next;
        debug!(clan_id = %clan_id, members = count, "Refreshed member count");
        Ok(Some(refreshed))
    }

    async fn matches(&self, member_id: &MemberId) -> Result<Vec<MatchRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .matches
            .iter()
            .filter(|m| &m.clan_member_id == member_id)
            .cloned()
            .collect())
    }

    async fn replace_matches(
        &self,
        member_id: &MemberId,
        matches: Vec<MatchRecord>,
    ) -> Result<usize, StorageError> {
        let mut window: Vec<MatchRecord> = Vec::with_capacity(MATCH_WINDOW);
        for record in matches {
            if window.len() == MATCH_WINDOW {
                break;
            }
            if record.clan_member_id != *member_id || window.iter().any(|m| m.id == record.id) {
                continue;
            }
            window.push(record);
        }
        let written = window.len();

        let mut tables = self.tables.write().await;
        let mut next: Vec<MatchRecord> = tables
            .matches
            .iter()
            .filter(|m| &m.clan_member_id != member_id)
            .cloned()
            .collect();
        next.extend(window);
        self.persist(Table::Matches, &next)?;
        tables.matches = next;
        debug!(member_id = %member_id, written, "Replaced match window");
        Ok(written)
    }

    async fn mode_stats(&self, member_id: &MemberId) -> Result<Vec<ModeStats>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .mode_stats
            .iter()
            .filter(|s| &s.clan_member_id == member_id)
            .cloned()
            .collect())
    }

    async fn replace_mode_stats(
        &self,
        member_id: &MemberId,
        stats: Vec<ModeStats>,
    ) -> Result<usize, StorageError> {
        let mut rows: Vec<ModeStats> = Vec::with_capacity(stats.len());
        for row in stats {
            if row.clan_member_id == *member_id && !rows.iter().any(|r| r.id == row.id) {
                rows.push(row);
            }
        }
        let written = rows.len();

        let mut tables = self.tables.write().await;
        let mut next: Vec<ModeStats> = tables
            .mode_stats
            .iter()
            .filter(|s| &s.clan_member_id != member_id)
            .cloned()
            .collect();
        next.extend(rows);
        self.persist(Table::ModeStats, &next)?;
        tables.mode_stats = next;
        debug!(member_id = %member_id, written, "Replaced mode stats");
        Ok(written)
    }
}
