use utoipa::OpenApi;

use crate::models::{
    Ballot, BallotChoice, BallotFormResponse, BallotSource, Choice, EmailTemplate,
    InvitationRequest, MajorityRule, ManualBallotRequest, Member, MemberBreakdown, MemberResponse,
    OnlineBallotRequest, OverrideRepresentativeRequest, Question, QuestionChoice, QuestionRequest,
    QuestionResult, RenderTemplateRequest, RepresentedMember, RenderTemplateResponse, RenderedInvitation,
    SetRepresentativeRequest, Tally, TallyShares, Vote, VoteDraftRequest, VoteResult, VoteState,
    VoteStatus, VotingWindow,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SVJ Hlasování API",
        version = "1.0.0",
        description = "Backend API pro hlasování per rollam ve společenstvích vlastníků jednotek",
        contact(
            name = "SVJ Team",
            email = "podpora@svj.example.cz"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "members", description = "Členové a trvalé zastoupení"),
        (name = "votes", description = "Hlasování, jeho životní cyklus a výsledky"),
        (name = "ballots", description = "Hlasovací lístky: online odkazy a ruční zápis"),
        (name = "templates", description = "Šablony e-mailů a dosazování proměnných")
    ),
    paths(
        // Members
        crate::api::buildings::list_members,
        crate::api::members::set_representative,
        // Votes
        crate::api::buildings::list_votes,
        crate::api::buildings::create_vote,
        crate::api::votes::get_vote,
        crate::api::votes::update_vote,
        crate::api::votes::start_vote,
        crate::api::votes::close_vote,
        crate::api::votes::cancel_vote,
        crate::api::votes::override_representative,
        crate::api::votes::get_results,
        // Ballots
        crate::api::votes::submit_manual_ballot,
        crate::api::hlasovani::get_ballot_form,
        crate::api::hlasovani::submit_online_ballot,
        // Templates
        crate::api::templates::render_template,
        crate::api::votes::render_vote_invitations,
    ),
    components(
        schemas(
            Member,
            MemberResponse,
            SetRepresentativeRequest,
            VoteStatus,
            VoteState,
            VotingWindow,
            MajorityRule,
            Question,
            QuestionRequest,
            Vote,
            VoteDraftRequest,
            OverrideRepresentativeRequest,
            Choice,
            BallotChoice,
            BallotSource,
            Ballot,
            ManualBallotRequest,
            OnlineBallotRequest,
            BallotFormResponse,
            RepresentedMember,
            Tally,
            TallyShares,
            QuestionResult,
            QuestionChoice,
            MemberBreakdown,
            VoteResult,
            EmailTemplate,
            RenderTemplateRequest,
            RenderTemplateResponse,
            InvitationRequest,
            RenderedInvitation,
        )
    )
)]
pub struct ApiDoc;
