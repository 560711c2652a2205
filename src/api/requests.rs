//! Maintenance request API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::request::{MaintenanceRequest, NewRequest, RequestFilter, RequestStatus, RequestType},
    services::requests::RequestEdit,
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RequestQuery {
    /// Restrict to one request type ("Corrective" or "Preventive")
    pub request_type: Option<String>,
    /// Restrict to one stage, e.g. "In Progress"
    pub status: Option<String>,
    /// Restrict to one handling team
    pub team_id: Option<i32>,
    /// `true` for overdue requests only, `false` to exclude them
    pub overdue: Option<bool>,
}

impl RequestQuery {
    fn into_filter(self) -> AppResult<RequestFilter> {
        Ok(RequestFilter {
            request_type: parse_param(self.request_type)?,
            status: parse_param(self.status)?,
            team_id: self.team_id,
            overdue: self.overdue,
        })
    }
}

/// Empty values are treated as absent
fn parse_param<T>(value: Option<String>) -> AppResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.parse().map_err(AppError::Validation))
        .transpose()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRequestBody {
    pub subject: String,
    pub request_type: RequestType,
    /// Ignored unless the caller is on the maintenance team
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusBody {
    pub status: RequestStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignBody {
    /// `null` clears the assignment
    pub user_id: Option<i32>,
}

/// List requests
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Request list", body = Vec<MaintenanceRequest>),
        (status = 400, description = "Unknown request type or status")
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<Vec<MaintenanceRequest>>> {
    let filter = query.into_filter()?;
    let today = Utc::now().date_naive();
    Ok(Json(state.services.requests.search(&filter, today).await?))
}

/// Open requests whose scheduled date has passed
#[utoipa::path(
    get,
    path = "/requests/overdue",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue requests", body = Vec<MaintenanceRequest>)
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<MaintenanceRequest>>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.services.requests.list_overdue(today).await?))
}

/// Get request by ID
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request details", body = MaintenanceRequest),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceRequest>> {
    Ok(Json(state.services.requests.get(id).await?))
}

/// Create request; status always starts at New
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = NewRequest,
    responses(
        (status = 201, description = "Request created", body = MaintenanceRequest),
        (status = 400, description = "Invalid subject or unknown equipment/team")
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(data): Json<NewRequest>,
) -> AppResult<(StatusCode, Json<MaintenanceRequest>)> {
    let request = state.services.requests.create(data).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Edit subject and type, and status for the maintenance team
#[utoipa::path(
    put,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    request_body = UpdateRequestBody,
    responses(
        (status = 200, description = "Request updated", body = MaintenanceRequest),
        (status = 404, description = "Request not found")
    )
)]
pub async fn update_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateRequestBody>,
) -> AppResult<Json<MaintenanceRequest>> {
    let edit = RequestEdit {
        subject: body.subject,
        request_type: body.request_type,
        status: body.status,
    };
    let request = state.services.requests.update(id, edit, Some(&claims)).await?;
    Ok(Json(request))
}

/// Move a request to another stage (maintenance team only)
#[utoipa::path(
    put,
    path = "/requests/{id}/status",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    request_body = StatusBody,
    responses(
        (status = 200, description = "Status changed", body = MaintenanceRequest),
        (status = 403, description = "Not on the maintenance team"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn set_request_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(body): Json<StatusBody>,
) -> AppResult<Json<MaintenanceRequest>> {
    let request = state
        .services
        .requests
        .set_status(id, body.status, Some(&claims))
        .await?;
    Ok(Json(request))
}

/// Assign a request to a user or clear the assignment
#[utoipa::path(
    put,
    path = "/requests/{id}/assign",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    request_body = AssignBody,
    responses(
        (status = 200, description = "Assignment changed", body = MaintenanceRequest),
        (status = 404, description = "Unknown request or user")
    )
)]
pub async fn assign_request(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(body): Json<AssignBody>,
) -> AppResult<Json<MaintenanceRequest>> {
    Ok(Json(state.services.requests.assign(id, body.user_id).await?))
}

/// Delete request (maintenance team only)
#[utoipa::path(
    delete,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 204, description = "Request deleted"),
        (status = 403, description = "Not on the maintenance team")
    )
)]
pub async fn delete_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.requests.delete(id, Some(&claims)).await?;
    Ok(StatusCode::NO_CONTENT)
}
