use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::models::{
    Ballot, BallotSource, BallotSubmission, InvitationRequest, ManualBallotRequest,
    OverrideRepresentativeRequest, RenderedInvitation, Roster, Vote, VoteDraftRequest, VoteResult,
};
use crate::services::{
    lifecycle, render_invitations, set_override, tabulate, BallotBox, SnapshotService,
    VoteSnapshot,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_vote).put(update_vote))
        .route("/:id/start", post(start_vote))
        .route("/:id/close", post(close_vote))
        .route("/:id/cancel", post(cancel_vote))
        .route(
            "/:id/representatives/:member_id",
            put(override_representative),
        )
        .route("/:id/ballots/manual", post(submit_manual_ballot))
        .route("/:id/results", get(get_results))
        .route("/:id/invitations", post(render_vote_invitations))
}

/// Detail hlasování
#[utoipa::path(
    get,
    path = "/api/v1/votes/{id}",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    responses(
        (status = 200, description = "Hlasování", body = Vote),
        (status = 404, description = "Hlasování nenalezeno")
    )
)]
pub async fn get_vote(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Vote>> {
    let vote = SnapshotService::load_vote(&state.pool, id).await?;
    Ok(Json(vote))
}

/// Upravit návrh hlasování
#[utoipa::path(
    put,
    path = "/api/v1/votes/{id}",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    request_body = VoteDraftRequest,
    responses(
        (status = 200, description = "Návrh upraven", body = Vote),
        (status = 400, description = "Hlasování už není návrh"),
        (status = 404, description = "Hlasování nenalezeno"),
        (status = 422, description = "Neplatný návrh")
    )
)]
pub async fn update_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VoteDraftRequest>,
) -> AppResult<Json<Vote>> {
    payload.validate()?;
    let mut vote = SnapshotService::load_vote(&state.pool, id).await?;

    lifecycle::update_draft(&mut vote, &payload, state.config.default_vote_days, Utc::now())?;
    SnapshotService::save_vote(&state.pool, &vote).await?;

    Ok(Json(vote))
}

/// Spustit hlasování a vygenerovat hlasovací odkazy
#[utoipa::path(
    post,
    path = "/api/v1/votes/{id}/start",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    responses(
        (status = 200, description = "Hlasování spuštěno", body = Vote),
        (status = 400, description = "Hlasování nelze spustit"),
        (status = 404, description = "Hlasování nenalezeno")
    )
)]
pub async fn start_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vote>> {
    let mut vote = SnapshotService::load_vote(&state.pool, id).await?;
    let members = SnapshotService::load_roster(&state.pool, vote.building_id).await?;

    lifecycle::start(&mut vote, &members, Utc::now(), lifecycle::generate_token)?;
    SnapshotService::save_vote(&state.pool, &vote).await?;

    Ok(Json(vote))
}

/// Ukončit hlasování
#[utoipa::path(
    post,
    path = "/api/v1/votes/{id}/close",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    responses(
        (status = 200, description = "Hlasování ukončeno", body = Vote),
        (status = 400, description = "Hlasování není aktivní"),
        (status = 404, description = "Hlasování nenalezeno")
    )
)]
pub async fn close_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vote>> {
    let mut vote = SnapshotService::load_vote(&state.pool, id).await?;

    lifecycle::close(&mut vote, Utc::now())?;
    SnapshotService::save_vote(&state.pool, &vote).await?;

    Ok(Json(vote))
}

/// Zrušit hlasování
#[utoipa::path(
    post,
    path = "/api/v1/votes/{id}/cancel",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    responses(
        (status = 200, description = "Hlasování zrušeno", body = Vote),
        (status = 400, description = "Hlasování už skončilo"),
        (status = 404, description = "Hlasování nenalezeno")
    )
)]
pub async fn cancel_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vote>> {
    let mut vote = SnapshotService::load_vote(&state.pool, id).await?;

    lifecycle::cancel(&mut vote, Utc::now())?;
    SnapshotService::save_vote(&state.pool, &vote).await?;

    Ok(Json(vote))
}

/// Změnit zastoupení člena pro toto hlasování
#[utoipa::path(
    put,
    path = "/api/v1/votes/{id}/representatives/{member_id}",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID hlasování"),
        ("member_id" = Uuid, Path, description = "ID zastoupeného člena")
    ),
    request_body = OverrideRepresentativeRequest,
    responses(
        (status = 200, description = "Zastoupení uloženo", body = Vote),
        (status = 400, description = "Hlasování už nelze upravit"),
        (status = 404, description = "Hlasování nenalezeno"),
        (status = 422, description = "Neplatný zástupce")
    )
)]
pub async fn override_representative(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<OverrideRepresentativeRequest>,
) -> AppResult<Json<Vote>> {
    let mut vote = SnapshotService::load_vote(&state.pool, id).await?;
    let members = SnapshotService::load_roster(&state.pool, vote.building_id).await?;
    let roster = Roster::new(&members);

    set_override(&mut vote, member_id, payload.representative_id, &roster)?;
    vote.updated_at = Utc::now();
    SnapshotService::save_vote(&state.pool, &vote).await?;

    Ok(Json(vote))
}

/// Zapsat listinný hlasovací lístek
#[utoipa::path(
    post,
    path = "/api/v1/votes/{id}/ballots/manual",
    tag = "ballots",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    request_body = ManualBallotRequest,
    responses(
        (status = 200, description = "Lístek přijat", body = Ballot),
        (status = 400, description = "Hlasování není aktivní"),
        (status = 409, description = "Člen už hlasoval"),
        (status = 422, description = "Neúplný nebo neplatný lístek")
    )
)]
pub async fn submit_manual_ballot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ManualBallotRequest>,
) -> AppResult<Json<Ballot>> {
    let VoteSnapshot {
        vote,
        members,
        ballots,
    } = SnapshotService::load_snapshot(&state.pool, id).await?;

    let submission = BallotSubmission {
        member_id: payload.member_id,
        cast_by: None,
        source: BallotSource::Manual,
        choices: payload.choices,
    };

    let mut ballot_box = BallotBox::with_ballots(&vote, &members, ballots);
    let ballot = ballot_box.submit(&submission, Utc::now())?.clone();
    SnapshotService::insert_ballot(&state.pool, &ballot).await?;

    Ok(Json(ballot))
}

/// Výsledky hlasování (průběžné, dokud hlasování běží)
#[utoipa::path(
    get,
    path = "/api/v1/votes/{id}/results",
    tag = "votes",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    responses(
        (status = 200, description = "Výsledky", body = VoteResult),
        (status = 404, description = "Hlasování nenalezeno")
    )
)]
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<VoteResult>> {
    let snapshot = SnapshotService::load_snapshot(&state.pool, id).await?;
    let result = tabulate(&snapshot.vote, &snapshot.members, &snapshot.ballots);
    Ok(Json(result))
}

/// Připravit pozvánky k hlasování podle šablony
#[utoipa::path(
    post,
    path = "/api/v1/votes/{id}/invitations",
    tag = "templates",
    params(
        ("id" = Uuid, Path, description = "ID hlasování")
    ),
    request_body = InvitationRequest,
    responses(
        (status = 200, description = "Vykreslené pozvánky", body = Vec<RenderedInvitation>),
        (status = 404, description = "Hlasování nebo šablona nenalezena"),
        (status = 422, description = "Neznámý člen")
    )
)]
pub async fn render_vote_invitations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvitationRequest>,
) -> AppResult<Json<Vec<RenderedInvitation>>> {
    let vote = SnapshotService::load_vote(&state.pool, id).await?;
    let template = SnapshotService::load_template(&state.pool, payload.template_id).await?;
    let building = SnapshotService::load_building(&state.pool, vote.building_id).await?;
    let variables = SnapshotService::load_variables(&state.pool).await?;
    let members = SnapshotService::load_roster(&state.pool, vote.building_id).await?;
    let roster = Roster::new(&members);

    let invitations = render_invitations(
        &template,
        &vote,
        Some(&building),
        &variables,
        &roster,
        &payload.member_ids,
        &state.config.public_origin,
    )?;

    tracing::info!(
        vote_id = %vote.id,
        count = invitations.len(),
        "Invitations rendered"
    );
    Ok(Json(invitations))
}
