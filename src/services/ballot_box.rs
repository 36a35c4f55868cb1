//! Příjem hlasovacích lístků.
//!
//! Lístek se kontroluje celý při odevzdání. Neúplný nebo opakovaný lístek
//! se odmítne, nikdy se nezapočítá jen částečně.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::VotingError;
use crate::models::{
    Ballot, BallotChoice, BallotSource, BallotSubmission, Member, Roster, Vote, VoteResult,
    VoteStatus,
};
use crate::services::representation::resolve_voter;
use crate::services::tabulator::tabulate;

/// Člen, kterému patří hlasovací token.
pub fn find_member_by_token(vote: &Vote, token: &str) -> Result<Uuid, VotingError> {
    vote.member_tokens
        .iter()
        .find(|(_, t)| t.as_str() == token)
        .map(|(member_id, _)| *member_id)
        .ok_or(VotingError::UnknownToken)
}

/// Lístek odevzdávaný přes hlasovací odkaz.
///
/// Odkaz opravňuje hlasovat za svého majitele. Zástupce může přes svůj
/// vlastní odkaz hlasovat i za zastoupeného člena (`member_id`); pak je
/// zapsán jako ten, kdo lístek odevzdal, a `validate_submission` ověří,
/// že je v tomto hlasování opravdu jeho zástupcem.
pub fn online_submission(
    vote: &Vote,
    token: &str,
    member_id: Option<Uuid>,
    choices: Vec<BallotChoice>,
) -> Result<BallotSubmission, VotingError> {
    let owner = find_member_by_token(vote, token)?;
    let member_id = member_id.unwrap_or(owner);
    Ok(BallotSubmission {
        member_id,
        cast_by: (member_id != owner).then_some(owner),
        source: BallotSource::Online,
        choices,
    })
}

fn normalize_choices(vote: &Vote, choices: &[BallotChoice]) -> Result<Vec<BallotChoice>, VotingError> {
    let mut seen = HashSet::new();
    for choice in choices {
        if vote.question(choice.question_id).is_none() {
            return Err(VotingError::UnknownQuestion(choice.question_id));
        }
        if !seen.insert(choice.question_id) {
            return Err(VotingError::DuplicateChoice(choice.question_id));
        }
    }

    // Volby v pořadí otázek hlasování.
    vote.questions
        .iter()
        .map(|q| {
            choices
                .iter()
                .find(|c| c.question_id == q.id)
                .copied()
                .ok_or(VotingError::IncompleteBallot(q.id))
        })
        .collect()
}

/// Zkontroluje odevzdávaný lístek proti snímku hlasování a vrátí lístek k uložení.
///
/// Online lístek smí odevzdat jen ten, kdo za člena v hlasování hlasuje
/// (člen sám nebo jeho zástupce). Ruční zápis správcem tuto kontrolu nemá.
pub fn validate_submission(
    vote: &Vote,
    roster: &Roster<'_>,
    existing: &[Ballot],
    submission: &BallotSubmission,
    now: DateTime<Utc>,
) -> Result<Ballot, VotingError> {
    if vote.status() != VoteStatus::Active {
        return Err(VotingError::VoteNotActive);
    }
    match vote.window() {
        Some(window) if window.contains(now) => {}
        _ => return Err(VotingError::OutsideVotingWindow),
    }

    let member: &Member = roster
        .get(submission.member_id)
        .ok_or(VotingError::UnknownMember(submission.member_id))?;

    let cast_by = match (submission.source, submission.cast_by) {
        (BallotSource::Online, Some(caster)) => {
            let representative = resolve_voter(member, vote, roster);
            if caster != representative {
                return Err(VotingError::NotRepresentative {
                    member: member.id,
                    representative,
                });
            }
            (caster != member.id).then_some(caster)
        }
        (BallotSource::Online, None) => None,
        (BallotSource::Manual, cast_by) => cast_by,
    };

    let choices = normalize_choices(vote, &submission.choices)?;

    if existing
        .iter()
        .any(|b| b.vote_id == vote.id && b.member_id == member.id)
    {
        return Err(VotingError::AlreadyVoted(member.id));
    }

    Ok(Ballot {
        id: Uuid::new_v4(),
        vote_id: vote.id,
        member_id: member.id,
        cast_by,
        source: submission.source,
        choices,
        submitted_at: now,
    })
}

/// Hlasovací urna jednoho hlasování nad snímkem v paměti.
#[derive(Debug)]
pub struct BallotBox<'a> {
    vote: &'a Vote,
    members: &'a [Member],
    roster: Roster<'a>,
    ballots: Vec<Ballot>,
}

impl<'a> BallotBox<'a> {
    pub fn new(vote: &'a Vote, members: &'a [Member]) -> Self {
        Self {
            vote,
            members,
            roster: Roster::new(members),
            ballots: Vec::new(),
        }
    }

    /// Urna s již uloženými lístky (např. načtenými z databáze).
    pub fn with_ballots(vote: &'a Vote, members: &'a [Member], ballots: Vec<Ballot>) -> Self {
        let mut ballot_box = Self::new(vote, members);
        ballot_box.ballots = ballots;
        ballot_box
    }

    pub fn submit(
        &mut self,
        submission: &BallotSubmission,
        now: DateTime<Utc>,
    ) -> Result<&Ballot, VotingError> {
        let ballot = validate_submission(self.vote, &self.roster, &self.ballots, submission, now)?;
        tracing::info!(
            vote_id = %ballot.vote_id,
            member_id = %ballot.member_id,
            source = ?ballot.source,
            "Ballot accepted"
        );
        let index = self.ballots.len();
        self.ballots.push(ballot);
        Ok(&self.ballots[index])
    }

    pub fn has_voted(&self, member_id: Uuid) -> bool {
        self.ballots.iter().any(|b| b.member_id == member_id)
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn results(&self) -> VoteResult {
        tabulate(self.vote, self.members, &self.ballots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, MajorityRule};
    use crate::services::test_support::{active_vote, draft_vote, member, question};
    use chrono::Duration;

    fn submission(vote: &Vote, member_id: Uuid, choices: &[Choice]) -> BallotSubmission {
        BallotSubmission {
            member_id,
            cast_by: None,
            source: BallotSource::Online,
            choices: vote
                .questions
                .iter()
                .zip(choices)
                .map(|(q, c)| BallotChoice {
                    question_id: q.id,
                    choice: *c,
                })
                .collect(),
        }
    }

    fn two_question_vote(building: Uuid) -> Vote {
        active_vote(
            building,
            vec![
                question("Rozpočet", MajorityRule::Simple),
                question("Výměna oken", MajorityRule::Qualified),
            ],
        )
    }

    #[test]
    fn test_duplicate_ballot_is_rejected_and_first_counts() {
        let building = Uuid::new_v4();
        let members = vec![member(building, "A", 60), member(building, "B", 40)];
        let vote = two_question_vote(building);
        let mut ballot_box = BallotBox::new(&vote, &members);
        let now = Utc::now();

        ballot_box
            .submit(&submission(&vote, members[0].id, &[Choice::Pro, Choice::Pro]), now)
            .unwrap();
        let second = ballot_box.submit(
            &submission(&vote, members[0].id, &[Choice::Against, Choice::Against]),
            now,
        );

        assert_eq!(second, Err(VotingError::AlreadyVoted(members[0].id)));
        assert_eq!(ballot_box.ballots().len(), 1);
        let result = ballot_box.results();
        assert_eq!(result.question_results[0].tallies.pro, 60);
        assert_eq!(result.question_results[0].tallies.against, 0);
    }

    #[test]
    fn test_delegate_cannot_vote_twice_for_represented_member() {
        let building = Uuid::new_v4();
        let d = member(building, "D", 10);
        let mut m = member(building, "M", 30);
        m.represented_by_member_id = Some(d.id);
        let members = vec![m.clone(), d.clone()];
        let vote = two_question_vote(building);
        let mut ballot_box = BallotBox::new(&vote, &members);
        let now = Utc::now();

        let mut by_delegate = submission(&vote, m.id, &[Choice::Pro, Choice::Abstain]);
        by_delegate.cast_by = Some(d.id);
        let accepted = ballot_box.submit(&by_delegate, now).unwrap();
        assert_eq!(accepted.cast_by, Some(d.id));

        assert_eq!(
            ballot_box.submit(&by_delegate, now),
            Err(VotingError::AlreadyVoted(m.id))
        );
        // vlastní lístek zástupce je samostatný
        ballot_box
            .submit(&submission(&vote, d.id, &[Choice::Against, Choice::Pro]), now)
            .unwrap();
        assert!(ballot_box.has_voted(m.id));
        assert!(ballot_box.has_voted(d.id));
        assert_eq!(ballot_box.results().voted_weight, 40);
    }

    #[test]
    fn test_online_caster_must_be_current_representative() {
        let building = Uuid::new_v4();
        let d = member(building, "D", 10);
        let mut m = member(building, "M", 30);
        m.represented_by_member_id = Some(d.id);
        let members = vec![m.clone(), d.clone()];
        let vote = two_question_vote(building);
        let roster = Roster::new(&members);

        let mut by_member = submission(&vote, m.id, &[Choice::Pro, Choice::Pro]);
        by_member.cast_by = Some(m.id);
        assert_eq!(
            validate_submission(&vote, &roster, &[], &by_member, Utc::now()),
            Err(VotingError::NotRepresentative {
                member: m.id,
                representative: d.id
            })
        );

        let mut manual = by_member.clone();
        manual.source = BallotSource::Manual;
        manual.cast_by = None;
        assert!(validate_submission(&vote, &roster, &[], &manual, Utc::now()).is_ok());
    }

    fn with_tokens(mut vote: Vote, members: &[Member]) -> Vote {
        vote.member_tokens = members
            .iter()
            .map(|m| (m.id, format!("token-{}", m.name)))
            .collect();
        vote
    }

    fn choices(vote: &Vote) -> Vec<BallotChoice> {
        submission(vote, Uuid::nil(), &[Choice::Pro, Choice::Against]).choices
    }

    #[test]
    fn test_own_link_records_no_caster() {
        let building = Uuid::new_v4();
        let d = member(building, "D", 10);
        let mut m = member(building, "M", 30);
        m.represented_by_member_id = Some(d.id);
        let members = vec![m.clone(), d.clone()];
        let vote = with_tokens(two_question_vote(building), &members);
        let mut ballot_box = BallotBox::new(&vote, &members);

        let own = online_submission(&vote, "token-M", None, choices(&vote)).unwrap();
        assert_eq!(own.member_id, m.id);
        assert_eq!(own.cast_by, None);

        let ballot = ballot_box.submit(&own, Utc::now()).unwrap();
        assert_eq!(ballot.member_id, m.id);
        assert_eq!(ballot.cast_by, None);
    }

    #[test]
    fn test_delegate_votes_for_represented_member_with_own_link() {
        let building = Uuid::new_v4();
        let d = member(building, "D", 10);
        let mut m = member(building, "M", 30);
        m.represented_by_member_id = Some(d.id);
        let members = vec![m.clone(), d.clone()];
        let vote = with_tokens(two_question_vote(building), &members);
        let mut ballot_box = BallotBox::new(&vote, &members);

        let for_m = online_submission(&vote, "token-D", Some(m.id), choices(&vote)).unwrap();
        assert_eq!(for_m.cast_by, Some(d.id));

        let ballot = ballot_box.submit(&for_m, Utc::now()).unwrap();
        assert_eq!(ballot.member_id, m.id);
        assert_eq!(ballot.cast_by, Some(d.id));
        assert_eq!(ballot_box.results().voted_weight, 30);
    }

    #[test]
    fn test_non_representative_link_cannot_vote_for_member() {
        let building = Uuid::new_v4();
        let d = member(building, "D", 10);
        let x = member(building, "X", 20);
        let mut m = member(building, "M", 30);
        m.represented_by_member_id = Some(d.id);
        let members = vec![m.clone(), d.clone(), x.clone()];
        let vote = with_tokens(two_question_vote(building), &members);
        let mut ballot_box = BallotBox::new(&vote, &members);

        let by_x = online_submission(&vote, "token-X", Some(m.id), choices(&vote)).unwrap();
        assert_eq!(
            ballot_box.submit(&by_x, Utc::now()),
            Err(VotingError::NotRepresentative {
                member: m.id,
                representative: d.id
            })
        );
        assert!(!ballot_box.has_voted(m.id));
    }

    #[test]
    fn test_override_moves_online_authority() {
        let building = Uuid::new_v4();
        let d = member(building, "D", 10);
        let x = member(building, "X", 20);
        let mut m = member(building, "M", 30);
        m.represented_by_member_id = Some(d.id);
        let members = vec![m.clone(), d.clone(), x.clone()];
        let mut vote = with_tokens(two_question_vote(building), &members);
        vote.representative_overrides.insert(m.id, Some(x.id));
        let mut ballot_box = BallotBox::new(&vote, &members);

        let by_d = online_submission(&vote, "token-D", Some(m.id), choices(&vote)).unwrap();
        assert_eq!(
            ballot_box.submit(&by_d, Utc::now()),
            Err(VotingError::NotRepresentative {
                member: m.id,
                representative: x.id
            })
        );

        let by_x = online_submission(&vote, "token-X", Some(m.id), choices(&vote)).unwrap();
        assert_eq!(
            ballot_box.submit(&by_x, Utc::now()).unwrap().cast_by,
            Some(x.id)
        );
    }

    #[test]
    fn test_unknown_link_is_rejected() {
        let building = Uuid::new_v4();
        let members = vec![member(building, "A", 10)];
        let vote = with_tokens(two_question_vote(building), &members);

        assert_eq!(
            online_submission(&vote, "token-nikdo", None, choices(&vote)),
            Err(VotingError::UnknownToken)
        );
    }

    #[test]
    fn test_incomplete_ballot_is_rejected() {
        let building = Uuid::new_v4();
        let members = vec![member(building, "A", 60)];
        let vote = two_question_vote(building);
        let roster = Roster::new(&members);

        let partial = submission(&vote, members[0].id, &[Choice::Pro]);
        assert_eq!(
            validate_submission(&vote, &roster, &[], &partial, Utc::now()),
            Err(VotingError::IncompleteBallot(vote.questions[1].id))
        );
    }

    #[test]
    fn test_unknown_and_repeated_questions_are_rejected() {
        let building = Uuid::new_v4();
        let members = vec![member(building, "A", 60)];
        let vote = two_question_vote(building);
        let roster = Roster::new(&members);
        let now = Utc::now();

        let mut unknown = submission(&vote, members[0].id, &[Choice::Pro, Choice::Pro]);
        let stray = Uuid::new_v4();
        unknown.choices.push(BallotChoice {
            question_id: stray,
            choice: Choice::Pro,
        });
        assert_eq!(
            validate_submission(&vote, &roster, &[], &unknown, now),
            Err(VotingError::UnknownQuestion(stray))
        );

        let mut repeated = submission(&vote, members[0].id, &[Choice::Pro, Choice::Pro]);
        repeated.choices.push(repeated.choices[0]);
        assert_eq!(
            validate_submission(&vote, &roster, &[], &repeated, now),
            Err(VotingError::DuplicateChoice(vote.questions[0].id))
        );
    }

    #[test]
    fn test_choices_are_stored_in_question_order() {
        let building = Uuid::new_v4();
        let members = vec![member(building, "A", 60)];
        let vote = two_question_vote(building);
        let roster = Roster::new(&members);
        let mut reversed = submission(&vote, members[0].id, &[Choice::Pro, Choice::Against]);
        reversed.choices.reverse();

        let ballot = validate_submission(&vote, &roster, &[], &reversed, Utc::now()).unwrap();
        assert_eq!(ballot.choices[0].question_id, vote.questions[0].id);
        assert_eq!(ballot.choices[1].choice, Choice::Against);
    }

    #[test]
    fn test_only_active_votes_accept_ballots() {
        let building = Uuid::new_v4();
        let members = vec![member(building, "A", 60)];
        let roster = Roster::new(&members);
        let draft = draft_vote(building);

        assert_eq!(
            validate_submission(
                &draft,
                &roster,
                &[],
                &submission(&draft, members[0].id, &[Choice::Pro]),
                Utc::now()
            ),
            Err(VotingError::VoteNotActive)
        );

        let expired = two_question_vote(building);
        let window = *expired.window().unwrap();
        let after_end = window.end_date + Duration::minutes(1);
        assert_eq!(
            validate_submission(
                &expired,
                &roster,
                &[],
                &submission(&expired, members[0].id, &[Choice::Pro, Choice::Pro]),
                after_end
            ),
            Err(VotingError::OutsideVotingWindow)
        );
    }

    #[test]
    fn test_unknown_member_is_rejected() {
        let building = Uuid::new_v4();
        let members = vec![member(building, "A", 60)];
        let roster = Roster::new(&members);
        let vote = two_question_vote(building);
        let stranger = Uuid::new_v4();

        assert_eq!(
            validate_submission(
                &vote,
                &roster,
                &[],
                &submission(&vote, stranger, &[Choice::Pro, Choice::Pro]),
                Utc::now()
            ),
            Err(VotingError::UnknownMember(stranger))
        );
    }

    #[test]
    fn test_find_member_by_token() {
        let building = Uuid::new_v4();
        let mut vote = draft_vote(building);
        let member_id = Uuid::new_v4();
        vote.member_tokens.insert(member_id, "secret".to_string());

        assert_eq!(find_member_by_token(&vote, "secret"), Ok(member_id));
        assert_eq!(
            find_member_by_token(&vote, "other"),
            Err(VotingError::UnknownToken)
        );
    }
}
