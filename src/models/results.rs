use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Choice, MajorityRule, VoteStatus};

/// Součty vah podle volby u jedné otázky.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, ToSchema)]
pub struct Tally {
    #[serde(rename = "PRO")]
    pub pro: u64,
    #[serde(rename = "PROTI")]
    pub against: u64,
    #[serde(rename = "ZDRŽEL SE")]
    pub abstain: u64,
}

impl Tally {
    pub fn add(&mut self, choice: Choice, weight: u64) {
        match choice {
            Choice::Pro => self.pro = self.pro.saturating_add(weight),
            Choice::Against => self.against = self.against.saturating_add(weight),
            Choice::Abstain => self.abstain = self.abstain.saturating_add(weight),
        }
    }

    pub fn get(&self, choice: Choice) -> u64 {
        match choice {
            Choice::Pro => self.pro,
            Choice::Against => self.against,
            Choice::Abstain => self.abstain,
        }
    }

    pub fn total(&self) -> u64 {
        self.pro
            .saturating_add(self.against)
            .saturating_add(self.abstain)
    }
}

/// Podíl jednotlivých voleb na celkové váze budovy v procentech.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, ToSchema)]
pub struct TallyShares {
    #[serde(rename = "PRO")]
    pub pro: Decimal,
    #[serde(rename = "PROTI")]
    pub against: Decimal,
    #[serde(rename = "ZDRŽEL SE")]
    pub abstain: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub rule: MajorityRule,
    pub rule_label: String,
    pub tallies: Tally,
    pub shares: TallyShares,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionChoice {
    pub question_id: Uuid,
    pub choice: Option<Choice>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberBreakdown {
    pub member_id: Uuid,
    pub name: String,
    pub unit_number: String,
    pub vote_weight: u64,
    /// Kdo za člena v tomto hlasování hlasuje (on sám nebo zástupce).
    pub effective_voter_id: Uuid,
    pub has_voted: bool,
    pub choices_by_question: Vec<QuestionChoice>,
}

/// Výsledek sečtení hlasování.
///
/// `passed` u otázek je konečný pouze tehdy, když `is_final` je `true`.
/// U probíhajícího hlasování jde o průběžný stav.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    pub vote_id: Uuid,
    pub status: VoteStatus,
    pub is_final: bool,
    /// Zrušené hlasování se nevyhodnocuje, čísla jsou jen informativní.
    pub is_cancelled: bool,
    pub total_weight: u64,
    pub voted_weight: u64,
    pub voted_member_count: usize,
    pub total_member_count: usize,
    pub participation_by_head: Decimal,
    pub participation_by_weight: Decimal,
    pub question_results: Vec<QuestionResult>,
    pub individual_breakdown: Vec<MemberBreakdown>,
}
