//! Načítání a ukládání snímků hlasování v PostgreSQL.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult, VotingError};
use crate::models::{
    Ballot, BallotChoice, BallotSource, Building, EmailTemplate, Member, Question, Variable, Vote,
    VoteState, VoteStatus, VotingWindow,
};
use crate::services::lifecycle::close_if_expired;

#[derive(Debug, FromRow)]
struct BuildingRow {
    id: Uuid,
    name: String,
    data: Json<BTreeMap<String, String>>,
}

impl From<BuildingRow> for Building {
    fn from(row: BuildingRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            data: row.data.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct VoteRow {
    id: Uuid,
    building_id: Uuid,
    title: String,
    description: String,
    days_duration: i32,
    questions: Json<Vec<Question>>,
    observer_emails: Vec<String>,
    member_tokens: Json<BTreeMap<Uuid, String>>,
    representative_overrides: Json<BTreeMap<Uuid, Option<Uuid>>>,
    status: VoteStatus,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupted(vote_id: Uuid, what: &str) -> AppError {
    tracing::error!(vote_id = %vote_id, "Inconsistent vote row: {}", what);
    AppError::Internal(format!("Nekonzistentní záznam hlasování {}", vote_id))
}

impl TryFrom<VoteRow> for Vote {
    type Error = AppError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let window = match (row.start_date, row.end_date) {
            (Some(start_date), Some(end_date)) => Some(VotingWindow {
                start_date,
                end_date,
            }),
            _ => None,
        };

        let state = match row.status {
            VoteStatus::Draft => VoteState::Draft,
            VoteStatus::Active => VoteState::Active {
                window: window.ok_or_else(|| corrupted(row.id, "active without window"))?,
            },
            VoteStatus::Closed => VoteState::Closed {
                window: window.ok_or_else(|| corrupted(row.id, "closed without window"))?,
                closed_at: row
                    .closed_at
                    .ok_or_else(|| corrupted(row.id, "closed without closed_at"))?,
            },
            VoteStatus::Cancelled => VoteState::Cancelled {
                window,
                cancelled_at: row
                    .cancelled_at
                    .ok_or_else(|| corrupted(row.id, "cancelled without cancelled_at"))?,
            },
        };

        let days_duration =
            u32::try_from(row.days_duration).map_err(|_| corrupted(row.id, "negative duration"))?;

        Ok(Self {
            id: row.id,
            building_id: row.building_id,
            title: row.title,
            description: row.description,
            days_duration,
            questions: row.questions.0,
            observer_emails: row.observer_emails,
            member_tokens: row.member_tokens.0,
            representative_overrides: row.representative_overrides.0,
            state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Sloupce stavu hlasování: status, začátek, konec, ukončení, zrušení.
type StateColumns = (
    VoteStatus,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

fn state_columns(state: &VoteState) -> StateColumns {
    let window = state.window();
    let start = window.map(|w| w.start_date);
    let end = window.map(|w| w.end_date);
    match state {
        VoteState::Draft | VoteState::Active { .. } => (state.status(), start, end, None, None),
        VoteState::Closed { closed_at, .. } => (state.status(), start, end, Some(*closed_at), None),
        VoteState::Cancelled { cancelled_at, .. } => {
            (state.status(), start, end, None, Some(*cancelled_at))
        }
    }
}

fn days_column(vote: &Vote) -> Result<i32, VotingError> {
    i32::try_from(vote.days_duration).map_err(|_| VotingError::InvalidDuration)
}

#[derive(Debug, FromRow)]
struct BallotRow {
    id: Uuid,
    vote_id: Uuid,
    member_id: Uuid,
    cast_by: Option<Uuid>,
    source: BallotSource,
    choices: Json<Vec<BallotChoice>>,
    submitted_at: DateTime<Utc>,
}

impl From<BallotRow> for Ballot {
    fn from(row: BallotRow) -> Self {
        Self {
            id: row.id,
            vote_id: row.vote_id,
            member_id: row.member_id,
            cast_by: row.cast_by,
            source: row.source,
            choices: row.choices.0,
            submitted_at: row.submitted_at,
        }
    }
}

/// Vše, co potřebuje sčítání a příjem lístků jednoho hlasování.
#[derive(Debug, Clone)]
pub struct VoteSnapshot {
    pub vote: Vote,
    pub members: Vec<Member>,
    pub ballots: Vec<Ballot>,
}

pub struct SnapshotService;

impl SnapshotService {
    pub async fn load_building(pool: &PgPool, id: Uuid) -> AppResult<Building> {
        let row = sqlx::query_as::<_, BuildingRow>("SELECT id, name, data FROM buildings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Budova nenalezena".to_string()))?;

        Ok(row.into())
    }

    pub async fn load_variables(pool: &PgPool) -> AppResult<Vec<Variable>> {
        let variables = sqlx::query_as::<_, Variable>(
            "SELECT id, key, description, scope, value FROM variables ORDER BY key",
        )
        .fetch_all(pool)
        .await?;

        Ok(variables)
    }

    /// Aktuální seznam členů budovy.
    pub async fn load_roster(pool: &PgPool, building_id: Uuid) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, building_id, name, email, phone, unit_number, vote_weight,
                   represented_by_member_id, greeting
            FROM members
            WHERE building_id = $1
            ORDER BY unit_number, name
            "#,
        )
        .bind(building_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn load_member(pool: &PgPool, id: Uuid) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, building_id, name, email, phone, unit_number, vote_weight,
                   represented_by_member_id, greeting
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Člen nenalezen".to_string()))
    }

    pub async fn set_permanent_representative(
        pool: &PgPool,
        member_id: Uuid,
        representative_id: Option<Uuid>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE members SET represented_by_member_id = $2 WHERE id = $1")
            .bind(member_id)
            .bind(representative_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Aktivní hlasování po termínu se při načtení rovnou ukončí.
    async fn settle(pool: &PgPool, row: VoteRow) -> AppResult<Vote> {
        let mut vote = Vote::try_from(row)?;
        if close_if_expired(&mut vote, Utc::now()) {
            Self::save_vote(pool, &vote).await?;
        }
        Ok(vote)
    }

    pub async fn load_vote(pool: &PgPool, id: Uuid) -> AppResult<Vote> {
        let row = sqlx::query_as::<_, VoteRow>("SELECT * FROM votes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Hlasování nenalezeno".to_string()))?;

        Self::settle(pool, row).await
    }

    pub async fn list_votes(pool: &PgPool, building_id: Uuid) -> AppResult<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            "SELECT * FROM votes WHERE building_id = $1 ORDER BY created_at DESC",
        )
        .bind(building_id)
        .fetch_all(pool)
        .await?;

        let mut votes = Vec::with_capacity(rows.len());
        for row in rows {
            votes.push(Self::settle(pool, row).await?);
        }
        Ok(votes)
    }

    pub async fn find_vote_by_token(pool: &PgPool, token: &str) -> AppResult<Vote> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT * FROM votes
            WHERE EXISTS (
                SELECT 1 FROM jsonb_each_text(member_tokens) t WHERE t.value = $1
            )
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Voting(VotingError::UnknownToken))?;

        Self::settle(pool, row).await
    }

    pub async fn insert_vote(pool: &PgPool, vote: &Vote) -> AppResult<()> {
        let days_duration = days_column(vote)?;
        let (status, start_date, end_date, closed_at, cancelled_at) = state_columns(&vote.state);

        sqlx::query(
            r#"
            INSERT INTO votes (
                id, building_id, title, description, days_duration, questions,
                observer_emails, member_tokens, representative_overrides,
                status, start_date, end_date, closed_at, cancelled_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(vote.id)
        .bind(vote.building_id)
        .bind(&vote.title)
        .bind(&vote.description)
        .bind(days_duration)
        .bind(Json(&vote.questions))
        .bind(&vote.observer_emails)
        .bind(Json(&vote.member_tokens))
        .bind(Json(&vote.representative_overrides))
        .bind(status)
        .bind(start_date)
        .bind(end_date)
        .bind(closed_at)
        .bind(cancelled_at)
        .bind(vote.created_at)
        .bind(vote.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn save_vote(pool: &PgPool, vote: &Vote) -> AppResult<()> {
        let days_duration = days_column(vote)?;
        let (status, start_date, end_date, closed_at, cancelled_at) = state_columns(&vote.state);

        let result = sqlx::query(
            r#"
            UPDATE votes SET
                title = $2, description = $3, days_duration = $4, questions = $5,
                observer_emails = $6, member_tokens = $7, representative_overrides = $8,
                status = $9, start_date = $10, end_date = $11, closed_at = $12,
                cancelled_at = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(vote.id)
        .bind(&vote.title)
        .bind(&vote.description)
        .bind(days_duration)
        .bind(Json(&vote.questions))
        .bind(&vote.observer_emails)
        .bind(Json(&vote.member_tokens))
        .bind(Json(&vote.representative_overrides))
        .bind(status)
        .bind(start_date)
        .bind(end_date)
        .bind(closed_at)
        .bind(cancelled_at)
        .bind(vote.updated_at)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Hlasování nenalezeno".to_string()));
        }
        Ok(())
    }

    pub async fn load_ballots(pool: &PgPool, vote_id: Uuid) -> AppResult<Vec<Ballot>> {
        let rows = sqlx::query_as::<_, BallotRow>(
            "SELECT * FROM ballots WHERE vote_id = $1 ORDER BY submitted_at, id",
        )
        .bind(vote_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Ballot::from).collect())
    }

    /// Jedinečnost (hlasování, člen) hlídá databáze, souběžné odeslání
    /// stejného lístku skončí chybou `AlreadyVoted`.
    pub async fn insert_ballot(pool: &PgPool, ballot: &Ballot) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO ballots (id, vote_id, member_id, cast_by, source, choices, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(ballot.id)
        .bind(ballot.vote_id)
        .bind(ballot.member_id)
        .bind(ballot.cast_by)
        .bind(ballot.source)
        .bind(Json(&ballot.choices))
        .bind(ballot.submitted_at)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(VotingError::AlreadyVoted(ballot.member_id).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn load_snapshot(pool: &PgPool, vote_id: Uuid) -> AppResult<VoteSnapshot> {
        let vote = Self::load_vote(pool, vote_id).await?;
        let members = Self::load_roster(pool, vote.building_id).await?;
        let ballots = Self::load_ballots(pool, vote.id).await?;

        Ok(VoteSnapshot {
            vote,
            members,
            ballots,
        })
    }

    pub async fn load_template(pool: &PgPool, id: Uuid) -> AppResult<EmailTemplate> {
        sqlx::query_as::<_, EmailTemplate>(
            "SELECT id, name, subject, body, category FROM email_templates WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Šablona nenalezena".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(status: VoteStatus) -> VoteRow {
        let now = Utc::now();
        VoteRow {
            id: Uuid::new_v4(),
            building_id: Uuid::new_v4(),
            title: "Hlasování".to_string(),
            description: String::new(),
            days_duration: 7,
            questions: Json(Vec::new()),
            observer_emails: Vec::new(),
            member_tokens: Json(BTreeMap::new()),
            representative_overrides: Json(BTreeMap::new()),
            status,
            start_date: None,
            end_date: None,
            closed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_vote_row_states() {
        let now = Utc::now();

        let draft = Vote::try_from(row(VoteStatus::Draft)).unwrap();
        assert_eq!(draft.state, VoteState::Draft);

        let mut active = row(VoteStatus::Active);
        active.start_date = Some(now);
        active.end_date = Some(now + Duration::days(7));
        let active = Vote::try_from(active).unwrap();
        assert_eq!(active.status(), VoteStatus::Active);
        assert_eq!(state_columns(&active.state).2, Some(now + Duration::days(7)));

        let mut cancelled = row(VoteStatus::Cancelled);
        cancelled.cancelled_at = Some(now);
        let cancelled = Vote::try_from(cancelled).unwrap();
        assert_eq!(
            cancelled.state,
            VoteState::Cancelled {
                window: None,
                cancelled_at: now
            }
        );
    }

    #[test]
    fn test_inconsistent_rows_are_rejected() {
        assert!(Vote::try_from(row(VoteStatus::Active)).is_err());
        assert!(Vote::try_from(row(VoteStatus::Cancelled)).is_err());

        let mut negative = row(VoteStatus::Draft);
        negative.days_duration = -1;
        assert!(Vote::try_from(negative).is_err());
    }

    #[test]
    fn test_days_column_does_not_wrap() {
        let mut vote = Vote::try_from(row(VoteStatus::Draft)).unwrap();
        assert_eq!(days_column(&vote), Ok(7));

        vote.days_duration = 3_000_000_000;
        assert_eq!(days_column(&vote), Err(VotingError::InvalidDuration));
    }

    #[test]
    fn test_state_columns_for_closed_vote() {
        let now = Utc::now();
        let window = VotingWindow {
            start_date: now - Duration::days(7),
            end_date: now,
        };
        let state = VoteState::Closed {
            window,
            closed_at: now,
        };

        assert_eq!(
            state_columns(&state),
            (
                VoteStatus::Closed,
                Some(window.start_date),
                Some(window.end_date),
                Some(now),
                None
            )
        );
    }
}
