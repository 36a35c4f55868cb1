//! Sečtení hlasovacích lístků do výsledků hlasování.
//!
//! Výsledek se vždy počítá znovu od začátku z aktuálního snímku (hlasování,
//! seznam členů, lístky). Nic se neukládá a pořadí lístků nehraje roli.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Ballot, Member, MemberBreakdown, QuestionChoice, QuestionResult, Roster, Tally, TallyShares,
    Vote, VoteResult, VoteStatus,
};
use crate::services::quorum::evaluate;
use crate::services::representation::resolve_voter;

/// Procento `part` z `total` zaokrouhlené na dvě desetinná místa. Pro nulový celek 0.
pub fn percentage(part: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
}

/// Vybere lístky, které se započítají, po jednom na člena.
///
/// Přeskakují se lístky jiného hlasování, lístky členů, kteří už nejsou
/// v seznamu (např. odstraněni po hlasování), a neúplné lístky. Přeskočení
/// není chyba: historická data musí jít sečíst i po změně seznamu členů.
fn counted_ballots<'b>(
    vote: &Vote,
    roster: &Roster<'_>,
    ballots: &'b [Ballot],
) -> BTreeMap<Uuid, &'b Ballot> {
    let mut counted: BTreeMap<Uuid, &'b Ballot> = BTreeMap::new();

    for ballot in ballots {
        if ballot.vote_id != vote.id {
            continue;
        }
        if !roster.contains(ballot.member_id) {
            tracing::warn!(
                vote_id = %vote.id,
                member_id = %ballot.member_id,
                "Ballot of a member missing from the roster is excluded from tallies"
            );
            continue;
        }
        if vote
            .questions
            .iter()
            .any(|q| ballot.choice_for(q.id).is_none())
        {
            tracing::warn!(
                vote_id = %vote.id,
                member_id = %ballot.member_id,
                "Incomplete ballot is excluded from tallies"
            );
            continue;
        }

        // Pokud snímek obsahuje víc lístků téhož člena, platí ten nejstarší.
        counted
            .entry(ballot.member_id)
            .and_modify(|kept| {
                if (ballot.submitted_at, ballot.id) < (kept.submitted_at, kept.id) {
                    *kept = ballot;
                }
            })
            .or_insert(ballot);
    }

    counted
}

/// Sečte hlasování.
///
/// Váha lístku je váha člena `ballot.member_id` podle seznamu členů.
/// `passed` je konečné jen u ukončeného hlasování (`is_final`).
pub fn tabulate(vote: &Vote, members: &[Member], ballots: &[Ballot]) -> VoteResult {
    let roster = Roster::new(members);
    let total_weight = roster.total_weight();
    let counted = counted_ballots(vote, &roster, ballots);

    let weight_of = |member_id: &Uuid| roster.get(*member_id).map_or(0, |m| m.vote_weight);
    let voted_weight = counted
        .keys()
        .map(weight_of)
        .fold(0, |total: u64, w| total.saturating_add(w));

    let question_results = vote
        .questions
        .iter()
        .map(|question| {
            let mut tallies = Tally::default();
            for (member_id, ballot) in &counted {
                if let Some(choice) = ballot.choice_for(question.id) {
                    tallies.add(choice, weight_of(member_id));
                }
            }

            QuestionResult {
                question_id: question.id,
                title: question.title.clone(),
                description: question.description.clone(),
                rule: question.rule,
                rule_label: question.rule.label(),
                shares: TallyShares {
                    pro: percentage(tallies.pro, total_weight),
                    against: percentage(tallies.against, total_weight),
                    abstain: percentage(tallies.abstain, total_weight),
                },
                passed: evaluate(question, &tallies, total_weight),
                tallies,
            }
        })
        .collect();

    let individual_breakdown = roster
        .members()
        .iter()
        .map(|member| {
            let ballot = counted.get(&member.id);
            MemberBreakdown {
                member_id: member.id,
                name: member.name.clone(),
                unit_number: member.unit_number.clone(),
                vote_weight: member.vote_weight,
                effective_voter_id: resolve_voter(member, vote, &roster),
                has_voted: ballot.is_some(),
                choices_by_question: vote
                    .questions
                    .iter()
                    .map(|q| QuestionChoice {
                        question_id: q.id,
                        choice: ballot.and_then(|b| b.choice_for(q.id)),
                    })
                    .collect(),
            }
        })
        .collect();

    tracing::debug!(
        vote_id = %vote.id,
        counted = counted.len(),
        submitted = ballots.len(),
        "Vote tabulated"
    );

    VoteResult {
        vote_id: vote.id,
        status: vote.status(),
        is_final: vote.status() == VoteStatus::Closed,
        is_cancelled: vote.status() == VoteStatus::Cancelled,
        total_weight,
        voted_weight,
        voted_member_count: counted.len(),
        total_member_count: roster.len(),
        participation_by_head: percentage(counted.len() as u64, roster.len() as u64),
        participation_by_weight: percentage(voted_weight, total_weight),
        question_results,
        individual_breakdown,
    }
}
