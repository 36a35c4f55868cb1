use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "vote_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Draft,
    Active,
    Closed,
    Cancelled,
}

impl VoteStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VoteStatus::Draft => "Návrh",
            VoteStatus::Active => "Aktivní",
            VoteStatus::Closed => "Ukončeno",
            VoteStatus::Cancelled => "Zrušeno",
        }
    }
}

impl fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
pub enum Choice {
    #[serde(rename = "PRO")]
    Pro,
    #[serde(rename = "PROTI")]
    Against,
    #[serde(rename = "ZDRŽEL SE")]
    Abstain,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Pro, Choice::Against, Choice::Abstain];

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Pro => "PRO",
            Choice::Against => "PROTI",
            Choice::Abstain => "ZDRŽEL SE",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pravidlo pro přijetí usnesení. Zlomek vlastního kvóra existuje jen u varianty `Custom`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "voteType", rename_all = "lowercase")]
pub enum MajorityRule {
    /// PRO > PROTI, zdržení se a nehlasující se nepočítají.
    #[default]
    Simple,
    /// Alespoň 3/4 vah všech členů budovy.
    Qualified,
    /// Všechny váhy budovy musí být PRO.
    Unanimous,
    Custom {
        #[serde(rename = "customQuorumNumerator")]
        numerator: u32,
        #[serde(rename = "customQuorumDenominator")]
        denominator: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub rule: MajorityRule,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VotingWindow {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl VotingWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_date && at <= self.end_date
    }
}

/// Stav hlasování. Termíny existují až po spuštění.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteState {
    Draft,
    Active {
        window: VotingWindow,
    },
    Closed {
        window: VotingWindow,
        #[serde(rename = "closedAt")]
        closed_at: DateTime<Utc>,
    },
    Cancelled {
        window: Option<VotingWindow>,
        #[serde(rename = "cancelledAt")]
        cancelled_at: DateTime<Utc>,
    },
}

impl VoteState {
    pub fn status(&self) -> VoteStatus {
        match self {
            VoteState::Draft => VoteStatus::Draft,
            VoteState::Active { .. } => VoteStatus::Active,
            VoteState::Closed { .. } => VoteStatus::Closed,
            VoteState::Cancelled { .. } => VoteStatus::Cancelled,
        }
    }

    pub fn window(&self) -> Option<&VotingWindow> {
        match self {
            VoteState::Draft => None,
            VoteState::Active { window } | VoteState::Closed { window, .. } => Some(window),
            VoteState::Cancelled { window, .. } => window.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub building_id: Uuid,
    pub title: String,
    pub description: String,
    pub days_duration: u32,
    pub questions: Vec<Question>,
    pub observer_emails: Vec<String>,
    /// Jednorázové tokeny pro online hlasování, klíčované ID člena.
    pub member_tokens: BTreeMap<Uuid, String>,
    /// Zastoupení pro toto hlasování. `None` výslovně ruší trvalého zástupce.
    pub representative_overrides: BTreeMap<Uuid, Option<Uuid>>,
    #[serde(flatten)]
    pub state: VoteState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn status(&self) -> VoteStatus {
        self.state.status()
    }

    pub fn window(&self) -> Option<&VotingWindow> {
        self.state.window()
    }

    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn token_for(&self, member_id: Uuid) -> Option<&str> {
        self.member_tokens.get(&member_id).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "ballot_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BallotSource {
    /// Odesláno přes hlasovací odkaz.
    Online,
    /// Ručně zapsáno správcem z listinného hlasovacího lístku.
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BallotChoice {
    pub question_id: Uuid,
    pub choice: Choice,
}

/// Odevzdaný hlasovací lístek. `member_id` je člen, jehož váha se započítává.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub id: Uuid,
    pub vote_id: Uuid,
    pub member_id: Uuid,
    /// Kdo lístek fyzicky odevzdal, pokud to byl zástupce.
    pub cast_by: Option<Uuid>,
    pub source: BallotSource,
    pub choices: Vec<BallotChoice>,
    pub submitted_at: DateTime<Utc>,
}

impl Ballot {
    pub fn choice_for(&self, question_id: Uuid) -> Option<Choice> {
        self.choices
            .iter()
            .find(|c| c.question_id == question_id)
            .map(|c| c.choice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotSubmission {
    pub member_id: Uuid,
    pub cast_by: Option<Uuid>,
    pub source: BallotSource,
    pub choices: Vec<BallotChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    #[validate(length(min = 1, message = "Otázka musí mít název"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub rule: MajorityRule,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteDraftRequest {
    #[validate(length(min = 1, max = 500, message = "Název hlasování nesmí být prázdný"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, max = 365, message = "Hlasování může trvat 1 až 365 dní"))]
    pub days_duration: Option<u32>,
    #[validate(
        length(min = 1, message = "Hlasování musí obsahovat alespoň jednu otázku"),
        nested
    )]
    pub questions: Vec<QuestionRequest>,
    #[serde(default)]
    pub observer_emails: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRepresentativeRequest {
    /// `null` znamená, že člen v tomto hlasování zastoupen není.
    pub representative_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualBallotRequest {
    pub member_id: Uuid,
    pub choices: Vec<BallotChoice>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnlineBallotRequest {
    /// Zastoupený člen, za kterého hlasuje majitel odkazu. Bez hodnoty majitel sám.
    #[serde(default)]
    pub member_id: Option<Uuid>,
    pub choices: Vec<BallotChoice>,
}

/// Člen, za kterého může majitel odkazu hlasovat jako zástupce.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepresentedMember {
    pub member_id: Uuid,
    pub name: String,
    pub already_voted: bool,
}

/// Co vidí hlasující po otevření hlasovacího odkazu.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BallotFormResponse {
    pub vote_id: Uuid,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    pub member_id: Uuid,
    pub member_name: String,
    pub voter_id: Uuid,
    pub voter_name: String,
    pub end_date: Option<DateTime<Utc>>,
    pub already_voted: bool,
    /// Členové, za které majitel odkazu v tomto hlasování hlasuje jako zástupce.
    pub represented_members: Vec<RepresentedMember>,
}
