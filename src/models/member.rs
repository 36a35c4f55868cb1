use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub building_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub unit_number: String,
    #[sqlx(try_from = "i64")]
    pub vote_weight: u64,
    /// Trvalý zástupce (plná moc), platí pro všechna hlasování.
    pub represented_by_member_id: Option<Uuid>,
    /// Individuální oslovení, např. "Vážený pane".
    pub greeting: Option<String>,
}

/// Seznam členů jedné budovy s indexem podle ID.
#[derive(Debug, Clone)]
pub struct Roster<'a> {
    members: &'a [Member],
    by_id: HashMap<Uuid, &'a Member>,
}

impl<'a> Roster<'a> {
    pub fn new(members: &'a [Member]) -> Self {
        let by_id = members.iter().map(|m| (m.id, m)).collect();
        Self { members, by_id }
    }

    pub fn get(&self, id: Uuid) -> Option<&'a Member> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn members(&self) -> &'a [Member] {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Součet vah všech členů budovy.
    pub fn total_weight(&self) -> u64 {
        self.members
            .iter()
            .fold(0, |total: u64, m| total.saturating_add(m.vote_weight))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetRepresentativeRequest {
    /// `null` ruší trvalé zastoupení.
    pub representative_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    #[serde(flatten)]
    pub member: Member,
    pub representative_name: Option<String>,
}
