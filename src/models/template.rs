use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub category: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderTemplateRequest {
    #[validate(length(min = 1, message = "Text šablony nesmí být prázdný"))]
    pub text: String,
    pub building_id: Option<Uuid>,
    pub vote_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RenderTemplateResponse {
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRequest {
    pub template_id: Uuid,
    /// Prázdný seznam znamená všechny členy budovy.
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// Vyplněná pozvánka připravená k odeslání.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedInvitation {
    pub member_id: Uuid,
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
}
