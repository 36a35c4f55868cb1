//! Vyhodnocení, zda otázka prošla podle svého pravidla většiny.
//!
//! Všechna porovnání podílů probíhají v celých číslech (křížovým násobením),
//! takže výsledek nezávisí na zaokrouhlování.

use crate::error::VotingError;
use crate::models::{MajorityRule, Question, Tally};

impl MajorityRule {
    /// Vlastní kvórum s kontrolou zlomku.
    pub fn custom(numerator: u32, denominator: u32) -> Result<Self, VotingError> {
        let rule = MajorityRule::Custom {
            numerator,
            denominator,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Zlomek musí být v intervalu (0, 1] a jmenovatel nenulový.
    pub fn validate(&self) -> Result<(), VotingError> {
        match *self {
            MajorityRule::Custom {
                numerator,
                denominator,
            } if denominator == 0 || numerator == 0 || numerator > denominator => {
                Err(VotingError::InvalidQuorumFraction {
                    numerator,
                    denominator,
                })
            }
            _ => Ok(()),
        }
    }

    /// Požadovaný podíl vah PRO na celkové váze budovy, pokud pravidlo nějaký má.
    pub fn required_fraction(&self) -> Option<(u64, u64)> {
        match *self {
            MajorityRule::Simple => None,
            MajorityRule::Qualified => Some((3, 4)),
            MajorityRule::Unanimous => Some((1, 1)),
            MajorityRule::Custom {
                numerator,
                denominator,
            } => Some((numerator as u64, denominator as u64)),
        }
    }

    pub fn is_satisfied(&self, tally: &Tally, total_weight: u64) -> bool {
        match self {
            MajorityRule::Simple => tally.pro > tally.against,
            MajorityRule::Unanimous => total_weight > 0 && tally.pro == total_weight,
            MajorityRule::Qualified | MajorityRule::Custom { .. } => {
                let Some((numerator, denominator)) = self.required_fraction() else {
                    return false;
                };
                if total_weight == 0 || denominator == 0 {
                    return false;
                }
                // pro / total >= numerator / denominator
                (tally.pro as u128) * (denominator as u128)
                    >= (total_weight as u128) * (numerator as u128)
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            MajorityRule::Simple => "Prostá většina".to_string(),
            MajorityRule::Qualified => "Kvalifikovaná většina".to_string(),
            MajorityRule::Unanimous => "Jednomyslná většina".to_string(),
            MajorityRule::Custom {
                numerator,
                denominator,
            } => format!("Vlastní kvórum ({}/{})", numerator, denominator),
        }
    }
}

/// Rozhodne, zda otázka prošla.
///
/// U probíhajícího hlasování je výsledek jen průběžný; rozlišit ho od
/// konečného musí volající (viz `VoteResult::is_final`).
pub fn evaluate(question: &Question, tally: &Tally, total_weight: u64) -> bool {
    question.rule.is_satisfied(tally, total_weight)
}
