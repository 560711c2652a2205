//! Board, calendar, dashboard and form endpoints.
//!
//! Each view returns the context a page template would be rendered with.
//! Form submissions are `application/x-www-form-urlencoded` and redirect to
//! the board on success.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::Equipment,
        request::{BoardStage, MaintenanceRequest, NewRequest, RequestStatus, RequestType},
        team::Team,
        user::{is_privileged, require_privileged, UserClaims},
    },
    services::{
        requests::{RequestEdit, STATUS_FORBIDDEN},
        stats::DashboardStats,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Kanban board context
#[derive(Serialize)]
pub struct BoardView {
    pub stages: Vec<BoardStage>,
    /// Whether the viewer may move cards and delete requests
    pub is_maintenance: bool,
}

/// Creation form context
#[derive(Serialize)]
pub struct RequestFormView {
    /// Request created by the submission that rendered this view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<MaintenanceRequest>,
    pub equipment: Vec<Equipment>,
    pub teams: Vec<Team>,
}

/// Edit form context
#[derive(Serialize)]
pub struct UpdateFormView {
    pub request: MaintenanceRequest,
    pub is_maintenance: bool,
}

#[derive(Serialize)]
pub struct CalendarView {
    pub requests: Vec<MaintenanceRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestForm {
    pub subject: Option<String>,
    pub equipment: Option<String>,
    pub team: Option<String>,
    pub request_type: Option<String>,
    pub scheduled_date: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestForm {
    pub subject: Option<String>,
    pub request_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Request id as sent by the board script, which may stringify it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i32),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdatePayload {
    pub id: RequestId,
    pub status: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    present(value).ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

fn parse_field<T: std::str::FromStr>(value: &str, field: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid {}: {}", field, value)))
}

fn parse_status(value: &str) -> AppResult<RequestStatus> {
    value.parse().map_err(AppError::Validation)
}

fn parse_type(value: &str) -> AppResult<RequestType> {
    value.parse().map_err(AppError::Validation)
}

impl RequestId {
    fn value(&self) -> AppResult<i32> {
        match self {
            RequestId::Number(id) => Ok(*id),
            RequestId::Text(s) => parse_field(s, "id"),
        }
    }
}

impl CreateRequestForm {
    fn into_new_request(self) -> AppResult<NewRequest> {
        let subject = required(self.subject, "subject")?;
        let equipment_id = parse_field(&required(self.equipment, "equipment")?, "equipment")?;
        let team_id = parse_field(&required(self.team, "team")?, "team")?;
        let request_type = parse_type(&required(self.request_type, "request_type")?)?;
        let scheduled_date = present(self.scheduled_date)
            .map(|d| {
                NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                    .map_err(|_| AppError::Validation(format!("Invalid scheduled_date: {}", d)))
            })
            .transpose()?;
        let duration = present(self.duration)
            .map(|d| parse_field(&d, "duration"))
            .transpose()?;

        Ok(NewRequest {
            subject,
            equipment_id,
            team_id,
            request_type,
            scheduled_date,
            duration,
        })
    }
}

async fn form_view(state: &AppState, created: Option<MaintenanceRequest>) -> AppResult<RequestFormView> {
    Ok(RequestFormView {
        created,
        equipment: state.services.equipment.list_all().await?,
        teams: state.services.teams.list().await?,
    })
}

/// Apply a `?status=` transition if one was supplied.
///
/// Missing requests fail first, then non-members, then unknown status names.
async fn apply_status_query(
    state: &AppState,
    id: i32,
    query: StatusQuery,
    claims: &UserClaims,
) -> AppResult<Option<Redirect>> {
    match present(query.status) {
        Some(status) => {
            state.services.requests.get(id).await?;
            require_privileged(Some(claims), STATUS_FORBIDDEN)?;
            let status = parse_status(&status)?;
            state.services.requests.set_status(id, status, Some(claims)).await?;
            Ok(Some(Redirect::to("/")))
        }
        None => Ok(None),
    }
}

/// Kanban board: every request under its stage
pub async fn board(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BoardView>> {
    let stages = state.services.requests.board().await?;
    Ok(Json(BoardView {
        stages,
        is_maintenance: is_privileged(Some(&claims)),
    }))
}

/// Creation form with current equipment and team lists
pub async fn create_form(State(state): State<AppState>) -> AppResult<Json<RequestFormView>> {
    Ok(Json(form_view(&state, None).await?))
}

/// Create a request from the form, then render the form again
pub async fn create_request(
    State(state): State<AppState>,
    Form(form): Form<CreateRequestForm>,
) -> AppResult<(StatusCode, Json<RequestFormView>)> {
    let data = form.into_new_request()?;
    let request = state.services.requests.create(data).await?;
    Ok((StatusCode::CREATED, Json(form_view(&state, Some(request)).await?)))
}

/// Status transition via `?status=`, otherwise the edit form
pub async fn update_page(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Response> {
    if let Some(redirect) = apply_status_query(&state, id, query, &claims).await? {
        return Ok(redirect.into_response());
    }

    let request = state.services.requests.get(id).await?;
    Ok(Json(UpdateFormView {
        request,
        is_maintenance: is_privileged(Some(&claims)),
    })
    .into_response())
}

/// Status transition via `?status=`, otherwise apply the edit form
pub async fn update_submit(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<StatusQuery>,
    Form(form): Form<UpdateRequestForm>,
) -> AppResult<Redirect> {
    if let Some(redirect) = apply_status_query(&state, id, query, &claims).await? {
        return Ok(redirect);
    }

    // Missing requests are reported before form errors
    state.services.requests.get(id).await?;

    // Non-members never get their status field read
    let status = if is_privileged(Some(&claims)) {
        present(form.status).map(|s| parse_status(&s)).transpose()?
    } else {
        None
    };
    let edit = RequestEdit {
        subject: required(form.subject, "subject")?,
        request_type: parse_type(&required(form.request_type, "request_type")?)?,
        status,
    };
    state.services.requests.update(id, edit, Some(&claims)).await?;
    Ok(Redirect::to("/"))
}

/// Delete a request (maintenance team only)
pub async fn delete_request(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> AppResult<Redirect> {
    let actor = user.as_ref().map(|u| &u.0);
    state.services.requests.delete(id, actor).await?;
    Ok(Redirect::to("/"))
}

/// Drag-and-drop status update from the board
pub async fn update_status_json(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Json(payload): Json<StatusUpdatePayload>,
) -> AppResult<Json<SuccessResponse>> {
    let id = payload.id.value()?;
    let status = parse_status(&payload.status)?;
    let actor = user.as_ref().map(|u| &u.0);
    state.services.requests.set_status(id, status, actor).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Request, equipment and team counters
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    Ok(Json(state.services.stats.dashboard().await?))
}

/// Preventive requests only
pub async fn calendar(State(state): State<AppState>) -> AppResult<Json<CalendarView>> {
    let requests = state.services.requests.calendar().await?;
    Ok(Json(CalendarView { requests }))
}
