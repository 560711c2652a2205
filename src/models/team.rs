//! Maintenance team model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Maintenance team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Team {
    pub id: i32,
    /// Display name
    pub name: String,
}

/// Create or rename a team
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TeamInput {
    #[validate(length(min = 1, max = 100, message = "Team name must be 1-100 characters"))]
    pub name: String,
}

/// Rows removed by a cascading delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CascadeReport {
    pub teams: u64,
    pub equipment: u64,
    pub requests: u64,
}
