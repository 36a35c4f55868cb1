use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Member, MemberResponse, Roster, SetRepresentativeRequest};
use crate::services::{validate_permanent_delegate, SnapshotService};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:id/representative", put(set_representative))
}

/// Nastavit nebo zrušit trvalého zástupce člena
#[utoipa::path(
    put,
    path = "/api/v1/members/{id}/representative",
    tag = "members",
    params(
        ("id" = Uuid, Path, description = "ID člena")
    ),
    request_body = SetRepresentativeRequest,
    responses(
        (status = 200, description = "Zástupce uložen", body = MemberResponse),
        (status = 404, description = "Člen nenalezen"),
        (status = 422, description = "Neplatný zástupce")
    )
)]
pub async fn set_representative(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<SetRepresentativeRequest>,
) -> AppResult<Json<MemberResponse>> {
    let member = SnapshotService::load_member(&state.pool, member_id).await?;
    let members = SnapshotService::load_roster(&state.pool, member.building_id).await?;
    let roster = Roster::new(&members);

    validate_permanent_delegate(&member, payload.representative_id, &roster)?;
    SnapshotService::set_permanent_representative(
        &state.pool,
        member_id,
        payload.representative_id,
    )
    .await?;

    tracing::info!(
        member_id = %member_id,
        representative_id = ?payload.representative_id,
        "Permanent representative updated"
    );

    let representative_name = payload
        .representative_id
        .and_then(|id| roster.get(id))
        .map(|rep| rep.name.clone());

    Ok(Json(MemberResponse {
        member: Member {
            represented_by_member_id: payload.representative_id,
            ..member
        },
        representative_name,
    }))
}
