use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{ApiError, Pagination, PaginationMeta};
use crate::models::{Clan, ClanId, ClanMember};
use crate::resolve::sort_roster;

#[derive(Debug, Deserialize)]
pub struct ClanParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ClanResponse {
    pub clan: Clan,
    pub members: Vec<ClanMember>,
    pub pagination: PaginationMeta,
}

/// A clan and its members, best score first.
pub async fn get_clan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ClanParams>,
) -> Result<Json<ClanResponse>, ApiError> {
    let clan_id = ClanId::from(id);
    let clan = state
        .store
        .clan(&clan_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("clan {}", clan_id)))?;

    let mut members = state
        .store
        .clan_members(&clan_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    sort_roster(&mut members);

    let pagination = Pagination::new(params.page, params.page_size);
    let meta = PaginationMeta::new(&pagination, members.len() as u32);

    Ok(Json(ClanResponse {
        clan,
        members: pagination.apply(members),
        pagination: meta,
    }))
}
