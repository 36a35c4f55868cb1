use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: Uuid,
    pub name: String,
    /// Hodnoty proměnných typu `building`, klíčované jejich klíčem.
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "variable_scope", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    Global,
    Building,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: Uuid,
    pub key: String,
    pub description: String,
    pub scope: VariableScope,
    /// Vyplněno pouze u globálních proměnných.
    pub value: Option<String>,
}

impl Variable {
    pub fn global(key: &str, value: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.to_string(),
            description: String::new(),
            scope: VariableScope::Global,
            value: Some(value.to_string()),
        }
    }
}
