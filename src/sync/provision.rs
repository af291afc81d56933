//! First-seen player provisioning.

use tracing::{debug, info};

use crate::models::{Clan, ClanInfo, ClanMember, PlayerBundle};
use crate::storage::{CacheStore, StorageError};

use super::BackgroundTasks;

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome {
    pub clan: Clan,
    pub member: ClanMember,

    /// False when another lookup inserted the member first
    pub member_created: bool,
}

/// Find or create the player's clan and member rows, queue a reconcile, and
/// refresh the clan's member count.
pub async fn provision(
    store: &dyn CacheStore,
    tasks: &BackgroundTasks,
    bundle: PlayerBundle,
) -> Result<ProvisionOutcome, StorageError> {
    let clan = resolve_clan(store, bundle.profile.clan.as_ref()).await?;

    let candidate = ClanMember::new(
        bundle.profile.shard,
        bundle.profile.nickname.clone(),
        clan.id.clone(),
    )
    .with_external_player_id(bundle.profile.account_id.clone());
    let inserted = store.insert_member_if_absent(candidate).await?;
    let member_created = inserted.was_created();
    let member = inserted.into_inner();
    if !member_created {
        debug!(member_id = %member.id, "Member already provisioned");
    }

    tasks.spawn_reconcile(member.id.clone(), bundle);

    let clan = store
        .refresh_member_count(&clan.id)
        .await?
        .ok_or_else(|| StorageError::RecordNotFound(format!("clan {}", clan.id)))?;

    Ok(ProvisionOutcome {
        clan,
        member,
        member_created,
    })
}

/// Clan lookup order: external id, then name (legacy rows without an
/// external id), then create. No clan info means the sentinel clan.
async fn resolve_clan(store: &dyn CacheStore, info: Option<&ClanInfo>) -> Result<Clan, StorageError> {
    let Some(info) = info else {
        return Ok(store
            .insert_clan_if_absent(Clan::unaffiliated())
            .await?
            .into_inner());
    };

    if let Some(external_id) = &info.external_clan_id {
        if let Some(clan) = store.find_clan_by_external_id(external_id).await? {
            let updated = apply_info(clan.clone(), info);
            return store_if_changed(store, &clan, updated).await;
        }
    }

    let legacy = store
        .find_clan_by_name(&info.name)
        .await?
        .filter(|clan| clan.external_clan_id.is_none());
    if let Some(clan) = legacy {
        let mut updated = apply_info(clan.clone(), info);
        if let Some(external_id) = &info.external_clan_id {
            info!(clan_id = %clan.id, external_id = %external_id, "Backfilling external id on legacy clan");
            updated.external_clan_id = Some(external_id.clone());
        }
        return store_if_changed(store, &clan, updated).await;
    }

    let clan = match &info.external_clan_id {
        Some(external_id) => Clan::new(external_id.clone(), info.name.clone()),
        None => Clan::named(info.name.clone()),
    }
    .with_tag(info.tag.clone())
    .with_level(info.level);

    Ok(store.insert_clan_if_absent(clan).await?.into_inner())
}

/// Member counts are left to `refresh_member_count`.
async fn store_if_changed(
    store: &dyn CacheStore,
    stored: &Clan,
    updated: Clan,
) -> Result<Clan, StorageError> {
    if &updated != stored {
        store.upsert_clan(updated.clone()).await?;
    }
    Ok(updated)
}

fn apply_info(mut clan: Clan, info: &ClanInfo) -> Clan {
    clan.name = info.name.clone();
    if info.tag.is_some() {
        clan.tag = info.tag.clone();
    }
    if info.level.is_some() {
        clan.level = info.level;
    }
    clan
}
