//! Doplňování proměnných `{{klic}}` do textů pro členy.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use uuid::Uuid;

use crate::error::VotingError;
use crate::models::{
    Building, EmailTemplate, Member, RenderedInvitation, Roster, Variable, VariableScope, Vote,
};
use crate::services::representation::resolve_delegate;

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_]+)\s*\}\}").unwrap());

pub const REPRESENTATIVE_NAME_KEY: &str = "jmeno_zastupce";
pub const VOTING_LINK_KEY: &str = "hlasovaci_odkaz";

/// Vše, z čeho se mohou brát hodnoty proměnných.
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionContext<'a> {
    pub building: Option<&'a Building>,
    pub variables: &'a [Variable],
    pub vote: Option<&'a Vote>,
    pub member: Option<&'a Member>,
    pub roster: Option<&'a Roster<'a>>,
    pub origin: &'a str,
}

impl<'a> SubstitutionContext<'a> {
    pub fn new(origin: &'a str) -> Self {
        Self {
            building: None,
            variables: &[],
            vote: None,
            member: None,
            roster: None,
            origin,
        }
    }

    pub fn with_building(mut self, building: &'a Building) -> Self {
        self.building = Some(building);
        self
    }

    pub fn with_variables(mut self, variables: &'a [Variable]) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_vote(mut self, vote: &'a Vote) -> Self {
        self.vote = Some(vote);
        self
    }

    pub fn with_member(mut self, member: &'a Member, roster: &'a Roster<'a>) -> Self {
        self.member = Some(member);
        self.roster = Some(roster);
        self
    }

    fn vote_value(&self, key: &str) -> Option<String> {
        let vote = self.vote?;
        match key {
            "title" => Some(vote.title.clone()),
            "description" => Some(vote.description.clone()),
            _ => None,
        }
    }

    fn building_value(&self, key: &str) -> Option<String> {
        let building = self.building?;
        match key {
            "name" => Some(building.name.clone()),
            REPRESENTATIVE_NAME_KEY => None,
            _ => building.data.get(key).cloned(),
        }
    }

    fn global_value(&self, key: &str) -> Option<String> {
        self.variables
            .iter()
            .find(|v| v.scope == VariableScope::Global && v.key == key)
            .map(|v| v.value.clone().unwrap_or_default())
    }

    fn member_value(&self, key: &str) -> Option<String> {
        let member = self.member?;
        match key {
            REPRESENTATIVE_NAME_KEY => {
                let roster = self.roster?;
                resolve_delegate(member, self.vote, roster).map(|d| d.name.clone())
            }
            VOTING_LINK_KEY => {
                let token = self.vote?.token_for(member.id)?;
                Some(format!(
                    "{}/hlasovani/{}",
                    self.origin.trim_end_matches('/'),
                    token
                ))
            }
            _ => None,
        }
    }

    /// Hodnota klíče podle priority: hlasování, budova, globální, člen.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.vote_value(key)
            .or_else(|| self.building_value(key))
            .or_else(|| self.global_value(key))
            .or_else(|| self.member_value(key))
    }
}

/// Nahradí všechny `{{klic}}` v textu.
///
/// Každý výskyt se nahrazuje jen jednou a dosazené hodnoty se dále
/// nerozbalují. Neznámé proměnné se z textu odstraní.
pub fn substitute(template: &str, context: &SubstitutionContext<'_>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            context.lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Připraví pozvánky k hlasování pro vybrané členy.
///
/// Zastoupenému členovi se pozvánka posílá jeho zástupci, odkaz v ní ale
/// vede na lístek zastoupeného. Prázdný výběr znamená celý seznam členů.
pub fn render_invitations(
    template: &EmailTemplate,
    vote: &Vote,
    building: Option<&Building>,
    variables: &[Variable],
    roster: &Roster<'_>,
    member_ids: &[Uuid],
    origin: &str,
) -> Result<Vec<RenderedInvitation>, VotingError> {
    if let Some(unknown) = member_ids.iter().find(|id| !roster.contains(**id)) {
        return Err(VotingError::UnknownMember(*unknown));
    }

    let mut invitations = Vec::new();
    for member in roster.members() {
        if !member_ids.is_empty() && !member_ids.contains(&member.id) {
            continue;
        }

        let recipient = resolve_delegate(member, Some(vote), roster).unwrap_or(member);
        if recipient.email.trim().is_empty() {
            tracing::warn!(member_id = %member.id, "Recipient has no e-mail, invitation skipped");
            continue;
        }

        let mut context = SubstitutionContext::new(origin)
            .with_variables(variables)
            .with_vote(vote)
            .with_member(member, roster);
        if let Some(building) = building {
            context = context.with_building(building);
        }

        invitations.push(RenderedInvitation {
            member_id: member.id,
            recipient_email: recipient.email.clone(),
            recipient_name: recipient.name.clone(),
            subject: substitute(&template.subject, &context),
            body: substitute(&template.body, &context),
        });
    }

    Ok(invitations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{draft_vote, member};
    use std::collections::BTreeMap;

    const ORIGIN: &str = "https://svj.example.cz";

    fn building() -> Building {
        let mut data = BTreeMap::new();
        data.insert("adresa".to_string(), "Dlouhá 12, Praha".to_string());
        data.insert("ico".to_string(), "12345678".to_string());
        Building {
            id: Uuid::new_v4(),
            name: "SVJ Dlouhá".to_string(),
            data,
        }
    }

    #[test]
    fn test_missing_representative_leaves_no_braces() {
        let b = building();
        let m = member(b.id, "Jan Novák", 10);
        let members = vec![m.clone()];
        let roster = Roster::new(&members);
        let context = SubstitutionContext::new(ORIGIN).with_member(&m, &roster);

        assert_eq!(substitute("Vážený {{jmeno_zastupce}}", &context), "Vážený ");
    }

    #[test]
    fn test_representative_name_uses_override() {
        let b = building();
        let d1 = member(b.id, "Petr Dvořák", 10);
        let d2 = member(b.id, "Eva Malá", 10);
        let mut m = member(b.id, "Jan Novák", 10);
        m.represented_by_member_id = Some(d1.id);
        let members = vec![m.clone(), d1.clone(), d2.clone()];
        let roster = Roster::new(&members);
        let mut vote = draft_vote(b.id);

        let context = SubstitutionContext::new(ORIGIN).with_member(&m, &roster);
        assert_eq!(
            substitute("Zástupce: {{jmeno_zastupce}}", &context),
            "Zástupce: Petr Dvořák"
        );

        vote.representative_overrides.insert(m.id, Some(d2.id));
        let context = SubstitutionContext::new(ORIGIN)
            .with_vote(&vote)
            .with_member(&m, &roster);
        assert_eq!(
            substitute("Zástupce: {{jmeno_zastupce}}", &context),
            "Zástupce: Eva Malá"
        );
    }

    #[test]
    fn test_voting_link_only_with_token() {
        let b = building();
        let m = member(b.id, "Jan Novák", 10);
        let members = vec![m.clone()];
        let roster = Roster::new(&members);
        let mut vote = draft_vote(b.id);

        let context = SubstitutionContext::new(ORIGIN)
            .with_vote(&vote)
            .with_member(&m, &roster);
        assert_eq!(substitute("Odkaz: {{hlasovaci_odkaz}}", &context), "Odkaz: ");

        vote.member_tokens.insert(m.id, "abc123".to_string());
        let context = SubstitutionContext::new("https://svj.example.cz/")
            .with_vote(&vote)
            .with_member(&m, &roster);
        assert_eq!(
            substitute("Odkaz: {{hlasovaci_odkaz}}", &context),
            "Odkaz: https://svj.example.cz/hlasovani/abc123"
        );
    }

    #[test]
    fn test_building_and_global_variables() {
        let b = building();
        let variables = vec![
            Variable::global("podpis_spravce", "Výbor SVJ"),
            Variable::global("adresa", "globální adresa"),
        ];
        let context = SubstitutionContext::new(ORIGIN)
            .with_building(&b)
            .with_variables(&variables);

        assert_eq!(
            substitute("{{name}}, {{ adresa }}, IČO {{ico}}. {{podpis_spravce}}", &context),
            "SVJ Dlouhá, Dlouhá 12, Praha, IČO 12345678. Výbor SVJ"
        );
    }

    #[test]
    fn test_vote_tokens_take_priority() {
        let b = building();
        let mut vote = draft_vote(b.id);
        vote.title = "Výměna výtahu".to_string();
        vote.description = String::new();
        let variables = vec![Variable::global("title", "globální název")];
        let context = SubstitutionContext::new(ORIGIN)
            .with_building(&b)
            .with_variables(&variables)
            .with_vote(&vote);

        assert_eq!(
            substitute("{{title}}|{{description}}|{{name}}", &context),
            "Výměna výtahu||SVJ Dlouhá"
        );
    }

    #[test]
    fn test_values_are_not_expanded_again() {
        let b = building();
        let variables = vec![
            Variable::global("pozdrav", "{{tajne}}"),
            Variable::global("tajne", "nesmí se objevit"),
        ];
        let context = SubstitutionContext::new(ORIGIN)
            .with_building(&b)
            .with_variables(&variables);

        assert_eq!(substitute("{{pozdrav}}", &context), "{{tajne}}");
    }

    #[test]
    fn test_unknown_placeholders_are_removed() {
        let context = SubstitutionContext::new(ORIGIN);
        assert_eq!(
            substitute("A{{neznamy}}B{{ jiny_klic }}C", &context),
            "ABC"
        );
        assert_eq!(substitute("bez proměnných", &context), "bez proměnných");
    }

    #[test]
    fn test_render_invitations_goes_to_delegate() {
        let b = building();
        let d = member(b.id, "Petr Dvořák", 10);
        let mut m = member(b.id, "Jan Novák", 20);
        m.represented_by_member_id = Some(d.id);
        let members = vec![m.clone(), d.clone()];
        let roster = Roster::new(&members);
        let mut vote = draft_vote(b.id);
        vote.title = "Rozpočet 2027".to_string();
        vote.member_tokens.insert(m.id, "tok-m".to_string());
        vote.member_tokens.insert(d.id, "tok-d".to_string());
        let template = EmailTemplate {
            id: Uuid::new_v4(),
            name: "Pozvánka".to_string(),
            subject: "Hlasování: {{title}}".to_string(),
            body: "{{name}} {{hlasovaci_odkaz}} {{jmeno_zastupce}}".to_string(),
            category: "hlasovani".to_string(),
        };

        let invitations =
            render_invitations(&template, &vote, Some(&b), &[], &roster, &[m.id], ORIGIN)
                .unwrap();

        assert_eq!(invitations.len(), 1);
        let invitation = &invitations[0];
        assert_eq!(invitation.member_id, m.id);
        assert_eq!(invitation.recipient_email, d.email);
        assert_eq!(invitation.subject, "Hlasování: Rozpočet 2027");
        assert_eq!(
            invitation.body,
            "SVJ Dlouhá https://svj.example.cz/hlasovani/tok-m Petr Dvořák"
        );

        let all = render_invitations(&template, &vote, Some(&b), &[], &roster, &[], ORIGIN)
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_render_invitations_rejects_unknown_member() {
        let b = building();
        let members = vec![member(b.id, "Jan Novák", 20)];
        let roster = Roster::new(&members);
        let vote = draft_vote(b.id);
        let template = EmailTemplate {
            id: Uuid::new_v4(),
            name: "Pozvánka".to_string(),
            subject: String::new(),
            body: String::new(),
            category: String::new(),
        };
        let stranger = Uuid::new_v4();

        assert_eq!(
            render_invitations(&template, &vote, None, &[], &roster, &[stranger], ORIGIN),
            Err(VotingError::UnknownMember(stranger))
        );
    }
}
