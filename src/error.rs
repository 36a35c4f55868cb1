use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::VoteStatus;

/// Chyby validace hlasování. Vrací je čisté jádro, nikdy je nepolyká.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    #[error("Hlasování není aktivní")]
    VoteNotActive,

    #[error("Hlasování není v aktivním období")]
    OutsideVotingWindow,

    #[error("Člen {0} není v seznamu členů budovy")]
    UnknownMember(Uuid),

    #[error("Otázka {0} nepatří k tomuto hlasování")]
    UnknownQuestion(Uuid),

    #[error("Hlasovací lístek není úplný: chybí volba pro otázku {0}")]
    IncompleteBallot(Uuid),

    #[error("Otázka {0} je na hlasovacím lístku vícekrát")]
    DuplicateChoice(Uuid),

    #[error("Za člena {0} již bylo hlasováno")]
    AlreadyVoted(Uuid),

    #[error("Za člena {member} může hlasovat pouze jeho zástupce {representative}")]
    NotRepresentative { member: Uuid, representative: Uuid },

    #[error("Neplatné vlastní kvórum {numerator}/{denominator}")]
    InvalidQuorumFraction { numerator: u32, denominator: u32 },

    #[error("Nelze přejít ze stavu {from} do stavu {to}")]
    InvalidTransition { from: VoteStatus, to: VoteStatus },

    #[error("Hlasování ve stavu {0} nelze upravovat")]
    NotEditable(VoteStatus),

    #[error("Člen nemůže zastupovat sám sebe")]
    SelfRepresentation,

    #[error("Zástupce {0} není členem této budovy")]
    RepresentativeOutsideRoster(Uuid),

    #[error("Název nesmí být prázdný")]
    EmptyTitle,

    #[error("Hlasování musí obsahovat alespoň jednu otázku")]
    NoQuestions,

    #[error("Délka hlasování musí být 1 až 365 dní")]
    InvalidDuration,

    #[error("Neplatný e-mail pozorovatele: {0}")]
    InvalidObserverEmail(String),

    #[error("Neplatný hlasovací odkaz")]
    UnknownToken,
}

impl VotingError {
    fn code(&self) -> &'static str {
        match self {
            VotingError::VoteNotActive | VotingError::OutsideVotingWindow => "VOTE_NOT_ACTIVE",
            VotingError::AlreadyVoted(_) => "ALREADY_VOTED",
            VotingError::NotRepresentative { .. } => "NOT_REPRESENTATIVE",
            VotingError::InvalidTransition { .. } | VotingError::NotEditable(_) => {
                "INVALID_TRANSITION"
            }
            VotingError::UnknownToken => "INVALID_TOKEN",
            _ => "VALIDATION_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            VotingError::AlreadyVoted(_) => StatusCode::CONFLICT,
            VotingError::NotRepresentative { .. } => StatusCode::FORBIDDEN,
            VotingError::UnknownToken => StatusCode::NOT_FOUND,
            VotingError::VoteNotActive
            | VotingError::OutsideVotingWindow
            | VotingError::InvalidTransition { .. }
            | VotingError::NotEditable(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Nenalezeno: {0}")]
    NotFound(String),

    #[error("Neplatný požadavek: {0}")]
    BadRequest(String),

    #[error("Konflikt: {0}")]
    Conflict(String),

    #[error("Chyba validace: {0}")]
    Validation(String),

    #[error(transparent)]
    Voting(#[from] VotingError),

    #[error("Chyba databáze: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Interní chyba: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                msg.clone(),
            ),
            AppError::Voting(e) => (e.status(), e.code(), e.to_string()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Chyba databáze".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Interní chyba".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
