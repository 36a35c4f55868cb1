//! Pomocné konstruktory pro testy jádra hlasování.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::models::{
    Ballot, BallotChoice, BallotSource, Choice, MajorityRule, Member, Question, Vote, VoteState,
    VotingWindow,
};

pub fn member(building_id: Uuid, name: &str, vote_weight: u64) -> Member {
    Member {
        id: Uuid::new_v4(),
        building_id,
        name: name.to_string(),
        email: format!("{}@example.cz", name.to_lowercase().replace(' ', ".")),
        phone: None,
        unit_number: format!("{}/1", name.len()),
        vote_weight,
        represented_by_member_id: None,
        greeting: None,
    }
}

pub fn question(title: &str, rule: MajorityRule) -> Question {
    Question {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        rule,
    }
}

pub fn draft_vote(building_id: Uuid) -> Vote {
    let now = Utc::now();
    Vote {
        id: Uuid::new_v4(),
        building_id,
        title: "Hlasování per rollam".to_string(),
        description: String::new(),
        days_duration: 7,
        questions: vec![question("Schválení účetní závěrky", MajorityRule::Simple)],
        observer_emails: Vec::new(),
        member_tokens: BTreeMap::new(),
        representative_overrides: BTreeMap::new(),
        state: VoteState::Draft,
        created_at: now,
        updated_at: now,
    }
}

/// Aktivní hlasování s danými otázkami, které začalo před hodinou.
pub fn active_vote(building_id: Uuid, questions: Vec<Question>) -> Vote {
    let now = Utc::now();
    let mut vote = draft_vote(building_id);
    vote.questions = questions;
    vote.state = VoteState::Active {
        window: VotingWindow {
            start_date: now - Duration::hours(1),
            end_date: now + Duration::days(7),
        },
    };
    vote
}

pub fn ballot(vote: &Vote, member_id: Uuid, choices: &[Choice]) -> Ballot {
    Ballot {
        id: Uuid::new_v4(),
        vote_id: vote.id,
        member_id,
        cast_by: None,
        source: BallotSource::Online,
        choices: vote
            .questions
            .iter()
            .zip(choices)
            .map(|(q, choice)| BallotChoice {
                question_id: q.id,
                choice: *choice,
            })
            .collect(),
        submitted_at: Utc::now(),
    }
}
