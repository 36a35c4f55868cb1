//! Kdo za člena v daném hlasování skutečně hlasuje.
//!
//! Zastoupení je pouze jednoúrovňové: zástupce zástupce se nehledá.

use uuid::Uuid;

use crate::error::VotingError;
use crate::models::{Member, Roster, Vote, VoteStatus};

/// Zástupce člena, pokud nějaký platí.
///
/// Zastoupení pro konkrétní hlasování (i výslovné `None`) má přednost před
/// trvalým zástupcem. Zástupce mimo seznam členů budovy se ignoruje, aby
/// osiřelý odkaz nerozbil sčítání.
pub fn resolve_delegate<'a>(
    member: &Member,
    vote: Option<&Vote>,
    roster: &Roster<'a>,
) -> Option<&'a Member> {
    let candidate = match vote.and_then(|v| v.representative_overrides.get(&member.id)) {
        Some(explicit) => *explicit,
        None => member.represented_by_member_id,
    }?;

    if candidate == member.id {
        return None;
    }

    match roster.get(candidate) {
        Some(delegate) if delegate.building_id == member.building_id => Some(delegate),
        _ => {
            tracing::warn!(
                member_id = %member.id,
                delegate_id = %candidate,
                "Delegate is not in the building roster, member votes for themself"
            );
            None
        }
    }
}

/// ID toho, kdo za člena v hlasování odevzdává lístek.
pub fn resolve_voter(member: &Member, vote: &Vote, roster: &Roster<'_>) -> Uuid {
    resolve_delegate(member, Some(vote), roster)
        .map(|delegate| delegate.id)
        .unwrap_or(member.id)
}

/// Členové, za které v tomto hlasování hlasuje daný zástupce.
pub fn represented_members<'a>(
    delegate_id: Uuid,
    vote: &Vote,
    roster: &Roster<'a>,
) -> Vec<&'a Member> {
    roster
        .members()
        .iter()
        .filter(|m| m.id != delegate_id && resolve_voter(m, vote, roster) == delegate_id)
        .collect()
}

/// Změní zástupce člena pro jedno hlasování.
///
/// Volba trvalého zástupce přepis zruší. `None` u člena s trvalým zástupcem
/// uloží výslovné "bez zastoupení".
pub fn set_override(
    vote: &mut Vote,
    member_id: Uuid,
    representative_id: Option<Uuid>,
    roster: &Roster<'_>,
) -> Result<(), VotingError> {
    let status = vote.status();
    if !matches!(status, VoteStatus::Draft | VoteStatus::Active) {
        return Err(VotingError::NotEditable(status));
    }

    let member = roster
        .get(member_id)
        .ok_or(VotingError::UnknownMember(member_id))?;

    if let Some(representative_id) = representative_id {
        validate_delegate(member, representative_id, roster)?;
    }

    if representative_id == member.represented_by_member_id {
        vote.representative_overrides.remove(&member_id);
    } else {
        vote.representative_overrides
            .insert(member_id, representative_id);
    }

    tracing::debug!(
        vote_id = %vote.id,
        member_id = %member_id,
        representative_id = ?representative_id,
        "Representative override updated"
    );
    Ok(())
}

/// Kontrola trvalého zástupce před uložením do seznamu členů.
pub fn validate_permanent_delegate(
    member: &Member,
    representative_id: Option<Uuid>,
    roster: &Roster<'_>,
) -> Result<(), VotingError> {
    match representative_id {
        Some(representative_id) => validate_delegate(member, representative_id, roster),
        None => Ok(()),
    }
}

fn validate_delegate(
    member: &Member,
    representative_id: Uuid,
    roster: &Roster<'_>,
) -> Result<(), VotingError> {
    if representative_id == member.id {
        return Err(VotingError::SelfRepresentation);
    }
    match roster.get(representative_id) {
        Some(delegate) if delegate.building_id == member.building_id => Ok(()),
        _ => Err(VotingError::RepresentativeOutsideRoster(representative_id)),
    }
}
