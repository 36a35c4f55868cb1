use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::models::{MemberResponse, Roster, Vote, VoteDraftRequest};
use crate::services::{lifecycle, SnapshotService};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/members", get(list_members))
        .route("/:id/votes", get(list_votes).post(create_vote))
}

/// Seznam členů budovy se jménem jejich trvalého zástupce
#[utoipa::path(
    get,
    path = "/api/v1/buildings/{id}/members",
    tag = "members",
    params(
        ("id" = Uuid, Path, description = "ID budovy")
    ),
    responses(
        (status = 200, description = "Seznam členů", body = Vec<MemberResponse>),
        (status = 404, description = "Budova nenalezena")
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path(building_id): Path<Uuid>,
) -> AppResult<Json<Vec<MemberResponse>>> {
    SnapshotService::load_building(&state.pool, building_id).await?;
    let members = SnapshotService::load_roster(&state.pool, building_id).await?;
    let roster = Roster::new(&members);

    let response = members
        .iter()
        .map(|member| MemberResponse {
            representative_name: member
                .represented_by_member_id
                .and_then(|id| roster.get(id))
                .map(|rep| rep.name.clone()),
            member: member.clone(),
        })
        .collect();

    Ok(Json(response))
}

/// Hlasování budovy, nejnovější první
#[utoipa::path(
    get,
    path = "/api/v1/buildings/{id}/votes",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID budovy")
    ),
    responses(
        (status = 200, description = "Seznam hlasování", body = Vec<Vote>)
    )
)]
pub async fn list_votes(
    State(state): State<AppState>,
    Path(building_id): Path<Uuid>,
) -> AppResult<Json<Vec<Vote>>> {
    let votes = SnapshotService::list_votes(&state.pool, building_id).await?;
    Ok(Json(votes))
}

/// Založit návrh hlasování
#[utoipa::path(
    post,
    path = "/api/v1/buildings/{id}/votes",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID budovy")
    ),
    request_body = VoteDraftRequest,
    responses(
        (status = 200, description = "Návrh hlasování vytvořen", body = Vote),
        (status = 404, description = "Budova nenalezena"),
        (status = 422, description = "Neplatný návrh")
    )
)]
pub async fn create_vote(
    State(state): State<AppState>,
    Path(building_id): Path<Uuid>,
    Json(payload): Json<VoteDraftRequest>,
) -> AppResult<Json<Vote>> {
    payload.validate()?;
    SnapshotService::load_building(&state.pool, building_id).await?;

    let vote = lifecycle::create_draft(
        building_id,
        &payload,
        state.config.default_vote_days,
        Utc::now(),
    )?;
    SnapshotService::insert_vote(&state.pool, &vote).await?;

    tracing::info!(vote_id = %vote.id, building_id = %building_id, "Vote draft created");
    Ok(Json(vote))
}
