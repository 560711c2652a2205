//! Team API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::team::{CascadeReport, Team, TeamInput},
    AppState,
};

use super::AuthenticatedUser;

/// List all teams
#[utoipa::path(
    get,
    path = "/teams",
    tag = "teams",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Team list", body = Vec<Team>)
    )
)]
pub async fn list_teams(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Team>>> {
    Ok(Json(state.services.teams.list().await?))
}

/// Get team by ID
#[utoipa::path(
    get,
    path = "/teams/{id}",
    tag = "teams",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team details", body = Team),
        (status = 404, description = "Team not found")
    )
)]
pub async fn get_team(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Team>> {
    Ok(Json(state.services.teams.get_by_id(id).await?))
}

/// Create team (admin only)
#[utoipa::path(
    post,
    path = "/teams",
    tag = "teams",
    security(("bearer_auth" = [])),
    request_body = TeamInput,
    responses(
        (status = 201, description = "Team created", body = Team),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn create_team(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<TeamInput>,
) -> AppResult<(StatusCode, Json<Team>)> {
    claims.require_admin()?;
    let team = state.services.teams.create(&data).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// Rename team (admin only)
#[utoipa::path(
    put,
    path = "/teams/{id}",
    tag = "teams",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Team ID")),
    request_body = TeamInput,
    responses(
        (status = 200, description = "Team updated", body = Team)
    )
)]
pub async fn update_team(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<TeamInput>,
) -> AppResult<Json<Team>> {
    claims.require_admin()?;
    Ok(Json(state.services.teams.rename(id, &data).await?))
}

/// Delete team with its equipment and requests (admin only)
#[utoipa::path(
    delete,
    path = "/teams/{id}",
    tag = "teams",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Rows removed by the cascade", body = CascadeReport),
        (status = 404, description = "Team not found")
    )
)]
pub async fn delete_team(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<CascadeReport>> {
    claims.require_admin()?;
    Ok(Json(state.services.teams.delete(id).await?))
}
