use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::error::AppResult;
use crate::models::{RenderTemplateRequest, RenderTemplateResponse, Roster};
use crate::services::{substitute, SnapshotService, SubstitutionContext};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/render", post(render_template))
}

/// Náhled textu s dosazenými proměnnými
#[utoipa::path(
    post,
    path = "/api/v1/templates/render",
    tag = "templates",
    request_body = RenderTemplateRequest,
    responses(
        (status = 200, description = "Vykreslený text", body = RenderTemplateResponse),
        (status = 404, description = "Budova, hlasování nebo člen nenalezen"),
        (status = 422, description = "Prázdný text")
    )
)]
pub async fn render_template(
    State(state): State<AppState>,
    Json(payload): Json<RenderTemplateRequest>,
) -> AppResult<Json<RenderTemplateResponse>> {
    payload.validate()?;

    let vote = match payload.vote_id {
        Some(id) => Some(SnapshotService::load_vote(&state.pool, id).await?),
        None => None,
    };
    let building = match payload
        .building_id
        .or_else(|| vote.as_ref().map(|v| v.building_id))
    {
        Some(id) => Some(SnapshotService::load_building(&state.pool, id).await?),
        None => None,
    };
    let member = match payload.member_id {
        Some(id) => Some(SnapshotService::load_member(&state.pool, id).await?),
        None => None,
    };
    let members = match &member {
        Some(m) => SnapshotService::load_roster(&state.pool, m.building_id).await?,
        None => Vec::new(),
    };
    let variables = SnapshotService::load_variables(&state.pool).await?;
    let roster = Roster::new(&members);

    let mut context =
        SubstitutionContext::new(&state.config.public_origin).with_variables(&variables);
    if let Some(building) = &building {
        context = context.with_building(building);
    }
    if let Some(vote) = &vote {
        context = context.with_vote(vote);
    }
    if let Some(member) = &member {
        context = context.with_member(member, &roster);
    }

    Ok(Json(RenderTemplateResponse {
        text: substitute(&payload.text, &context),
    }))
}
