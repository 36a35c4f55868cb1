use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::error::{AppResult, VotingError};
use crate::models::{
    Ballot, BallotFormResponse, OnlineBallotRequest, RepresentedMember, Roster,
};
use crate::services::{
    find_member_by_token, online_submission, represented_members, resolve_voter, BallotBox,
    SnapshotService,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:token", get(get_ballot_form).post(submit_online_ballot))
}

/// Hlasovací lístek pro majitele odkazu
#[utoipa::path(
    get,
    path = "/api/v1/hlasovani/{token}",
    tag = "ballots",
    params(
        ("token" = String, Path, description = "Hlasovací token")
    ),
    responses(
        (status = 200, description = "Hlasovací lístek", body = BallotFormResponse),
        (status = 404, description = "Neplatný hlasovací odkaz")
    )
)]
pub async fn get_ballot_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<BallotFormResponse>> {
    let vote = SnapshotService::find_vote_by_token(&state.pool, &token).await?;
    let member_id = find_member_by_token(&vote, &token)?;
    let members = SnapshotService::load_roster(&state.pool, vote.building_id).await?;
    let ballots = SnapshotService::load_ballots(&state.pool, vote.id).await?;
    let roster = Roster::new(&members);
    let ballot_box = BallotBox::with_ballots(&vote, &members, ballots);

    let member = roster
        .get(member_id)
        .ok_or(VotingError::UnknownMember(member_id))?;
    let voter_id = resolve_voter(member, &vote, &roster);
    let voter_name = roster
        .get(voter_id)
        .map(|voter| voter.name.clone())
        .unwrap_or_else(|| member.name.clone());

    Ok(Json(BallotFormResponse {
        vote_id: vote.id,
        title: vote.title.clone(),
        description: vote.description.clone(),
        questions: vote.questions.clone(),
        member_id,
        member_name: member.name.clone(),
        voter_id,
        voter_name,
        end_date: vote.window().map(|w| w.end_date),
        already_voted: ballot_box.has_voted(member_id),
        represented_members: represented_members(member_id, &vote, &roster)
            .into_iter()
            .map(|m| RepresentedMember {
                member_id: m.id,
                name: m.name.clone(),
                already_voted: ballot_box.has_voted(m.id),
            })
            .collect(),
    }))
}

/// Odevzdat hlasovací lístek přes odkaz
#[utoipa::path(
    post,
    path = "/api/v1/hlasovani/{token}",
    tag = "ballots",
    params(
        ("token" = String, Path, description = "Hlasovací token")
    ),
    request_body = OnlineBallotRequest,
    responses(
        (status = 200, description = "Lístek přijat", body = Ballot),
        (status = 400, description = "Hlasování není aktivní"),
        (status = 403, description = "Majitel odkazu není zástupcem člena"),
        (status = 404, description = "Neplatný hlasovací odkaz"),
        (status = 409, description = "Za člena už bylo hlasováno"),
        (status = 422, description = "Neúplný nebo neplatný lístek")
    )
)]
pub async fn submit_online_ballot(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<OnlineBallotRequest>,
) -> AppResult<Json<Ballot>> {
    let vote = SnapshotService::find_vote_by_token(&state.pool, &token).await?;
    let submission = online_submission(&vote, &token, payload.member_id, payload.choices)?;
    let members = SnapshotService::load_roster(&state.pool, vote.building_id).await?;
    let ballots = SnapshotService::load_ballots(&state.pool, vote.id).await?;

    let mut ballot_box = BallotBox::with_ballots(&vote, &members, ballots);
    let ballot = ballot_box.submit(&submission, Utc::now())?.clone();
    SnapshotService::insert_ballot(&state.pool, &ballot).await?;

    Ok(Json(ballot))
}
