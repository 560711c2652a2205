//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, equipment, health, requests, stats, teams, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GearGuard API",
        version = "0.1.0",
        description = "Maintenance request tracking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Teams
        teams::list_teams,
        teams::get_team,
        teams::create_team,
        teams::update_team,
        teams::delete_team,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Requests
        requests::list_requests,
        requests::list_overdue,
        requests::get_request,
        requests::create_request,
        requests::update_request,
        requests::set_request_status,
        requests::assign_request,
        requests::delete_request,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::delete_user,
        // Stats
        stats::get_dashboard,
        stats::get_team_report,
        stats::get_equipment_report,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            // Teams
            crate::models::team::Team,
            crate::models::team::TeamInput,
            crate::models::team::CascadeReport,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            // Requests
            crate::models::request::MaintenanceRequest,
            crate::models::request::NewRequest,
            crate::models::request::RequestStatus,
            crate::models::request::RequestType,
            crate::models::request::StatusCounts,
            requests::UpdateRequestBody,
            requests::StatusBody,
            requests::AssignBody,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::CreateUser,
            // Stats
            crate::services::stats::DashboardStats,
            crate::services::stats::TeamReport,
            crate::services::stats::EquipmentReport,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "teams", description = "Maintenance teams"),
        (name = "equipment", description = "Equipment registry"),
        (name = "requests", description = "Maintenance request lifecycle"),
        (name = "users", description = "User management"),
        (name = "stats", description = "Statistics and reports")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
