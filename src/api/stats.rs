//! Statistics endpoints

use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    error::AppResult,
    services::stats::{DashboardStats, EquipmentReport, TeamReport},
    AppState,
};

use super::AuthenticatedUser;

/// Request counts per stage plus equipment and team totals
#[utoipa::path(
    get,
    path = "/stats/dashboard",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<DashboardStats>> {
    Ok(Json(state.services.stats.dashboard().await?))
}

/// Request breakdown per handling team
#[utoipa::path(
    get,
    path = "/reports/teams",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One row per team", body = Vec<TeamReport>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_team_report(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<TeamReport>>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.services.stats.team_report(today).await?))
}

/// Request breakdown per piece of equipment
#[utoipa::path(
    get,
    path = "/reports/equipment",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One row per piece of equipment", body = Vec<EquipmentReport>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_equipment_report(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<EquipmentReport>>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.services.stats.equipment_report(today).await?))
}
