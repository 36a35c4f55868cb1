//! Životní cyklus hlasování: návrh, spuštění, ukončení, zrušení.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use uuid::Uuid;

use crate::error::VotingError;
use crate::models::{
    Member, Question, Vote, VoteDraftRequest, VoteState, VoteStatus, VotingWindow,
};
use crate::utils::{sanitize_string, split_email_list, validate_email};

/// Nejdelší povolená délka hlasování ve dnech.
pub const MAX_VOTE_DAYS: u32 = 365;

/// Neuhodnutelný token pro hlasovací odkaz.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

struct DraftFields {
    title: String,
    description: String,
    days_duration: u32,
    questions: Vec<Question>,
    observer_emails: Vec<String>,
}

fn validate_draft(request: &VoteDraftRequest, default_days: u32) -> Result<DraftFields, VotingError> {
    let title = sanitize_string(&request.title);
    if title.is_empty() {
        return Err(VotingError::EmptyTitle);
    }
    if request.questions.is_empty() {
        return Err(VotingError::NoQuestions);
    }

    let questions = request
        .questions
        .iter()
        .map(|q| {
            let title = sanitize_string(&q.title);
            if title.is_empty() {
                return Err(VotingError::EmptyTitle);
            }
            q.rule.validate()?;
            Ok(Question {
                id: Uuid::new_v4(),
                title,
                description: q.description.trim().to_string(),
                rule: q.rule,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let days_duration = request.days_duration.unwrap_or(default_days);
    if days_duration == 0 || days_duration > MAX_VOTE_DAYS {
        return Err(VotingError::InvalidDuration);
    }

    let observer_emails: Vec<String> = request
        .observer_emails
        .iter()
        .flat_map(|entry| split_email_list(entry))
        .collect();
    if let Some(invalid) = observer_emails.iter().find(|e| !validate_email(e)) {
        return Err(VotingError::InvalidObserverEmail(invalid.clone()));
    }

    Ok(DraftFields {
        title,
        description: request.description.trim().to_string(),
        days_duration,
        questions,
        observer_emails,
    })
}

/// Nový návrh hlasování pro budovu.
pub fn create_draft(
    building_id: Uuid,
    request: &VoteDraftRequest,
    default_days: u32,
    now: DateTime<Utc>,
) -> Result<Vote, VotingError> {
    let fields = validate_draft(request, default_days)?;
    Ok(Vote {
        id: Uuid::new_v4(),
        building_id,
        title: fields.title,
        description: fields.description,
        days_duration: fields.days_duration,
        questions: fields.questions,
        observer_emails: fields.observer_emails,
        member_tokens: BTreeMap::new(),
        representative_overrides: BTreeMap::new(),
        state: VoteState::Draft,
        created_at: now,
        updated_at: now,
    })
}

/// Úprava návrhu. Spuštěné hlasování je neměnné.
pub fn update_draft(
    vote: &mut Vote,
    request: &VoteDraftRequest,
    default_days: u32,
    now: DateTime<Utc>,
) -> Result<(), VotingError> {
    if vote.status() != VoteStatus::Draft {
        return Err(VotingError::NotEditable(vote.status()));
    }
    let fields = validate_draft(request, default_days)?;
    vote.title = fields.title;
    vote.description = fields.description;
    vote.days_duration = fields.days_duration;
    vote.questions = fields.questions;
    vote.observer_emails = fields.observer_emails;
    vote.updated_at = now;
    Ok(())
}

/// Spustí hlasování a vygeneruje každému členovi hlasovací token.
pub fn start(
    vote: &mut Vote,
    members: &[Member],
    now: DateTime<Utc>,
    mut token: impl FnMut() -> String,
) -> Result<(), VotingError> {
    if vote.status() != VoteStatus::Draft {
        return Err(VotingError::InvalidTransition {
            from: vote.status(),
            to: VoteStatus::Active,
        });
    }
    if vote.questions.is_empty() {
        return Err(VotingError::NoQuestions);
    }

    if vote.days_duration == 0 || vote.days_duration > MAX_VOTE_DAYS {
        return Err(VotingError::InvalidDuration);
    }
    let end_date = now
        .checked_add_signed(Duration::days(i64::from(vote.days_duration)))
        .ok_or(VotingError::InvalidDuration)?;

    vote.member_tokens = members.iter().map(|m| (m.id, token())).collect();
    vote.state = VoteState::Active {
        window: VotingWindow {
            start_date: now,
            end_date,
        },
    };
    vote.updated_at = now;

    tracing::info!(
        vote_id = %vote.id,
        tokens = vote.member_tokens.len(),
        "Vote started"
    );
    Ok(())
}

pub fn close(vote: &mut Vote, now: DateTime<Utc>) -> Result<(), VotingError> {
    match vote.state {
        VoteState::Active { window } => {
            vote.state = VoteState::Closed {
                window,
                closed_at: now,
            };
            vote.updated_at = now;
            tracing::info!(vote_id = %vote.id, "Vote closed");
            Ok(())
        }
        _ => Err(VotingError::InvalidTransition {
            from: vote.status(),
            to: VoteStatus::Closed,
        }),
    }
}

/// Ukončí aktivní hlasování, kterému uplynul termín. Vrací, zda došlo ke změně.
pub fn close_if_expired(vote: &mut Vote, now: DateTime<Utc>) -> bool {
    match vote.state {
        VoteState::Active { window } if now > window.end_date => {
            vote.state = VoteState::Closed {
                window,
                closed_at: window.end_date,
            };
            vote.updated_at = now;
            tracing::info!(vote_id = %vote.id, "Vote closed after its end date");
            true
        }
        _ => false,
    }
}

/// Zrušení je nevratné.
pub fn cancel(vote: &mut Vote, now: DateTime<Utc>) -> Result<(), VotingError> {
    let window = match vote.state {
        VoteState::Draft => None,
        VoteState::Active { window } => Some(window),
        VoteState::Closed { .. } | VoteState::Cancelled { .. } => {
            return Err(VotingError::InvalidTransition {
                from: vote.status(),
                to: VoteStatus::Cancelled,
            })
        }
    };
    vote.state = VoteState::Cancelled {
        window,
        cancelled_at: now,
    };
    vote.updated_at = now;
    tracing::info!(vote_id = %vote.id, "Vote cancelled");
    Ok(())
}
