//! API handlers for GearGuard endpoints

pub mod auth;
pub mod equipment;
pub mod health;
pub mod openapi;
pub mod requests;
pub mod site;
pub mod stats;
pub mod teams;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token.
///
/// Wrap in `Option` for routes that also serve anonymous callers.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Board, forms and views
    let site = Router::new()
        .route("/", get(site::board))
        .route("/create/", get(site::create_form).post(site::create_request))
        .route("/new-request/", get(site::create_form).post(site::create_request))
        .route("/update/", post(site::update_status_json))
        .route("/update/:id/", get(site::update_page).post(site::update_submit))
        .route("/delete/:id/", post(site::delete_request))
        .route("/dashboard/", get(site::dashboard))
        .route("/calendar/", get(site::calendar))
        .with_state(state.clone());

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Teams
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route(
            "/teams/:id",
            get(teams::get_team).put(teams::update_team).delete(teams::delete_team),
        )
        // Equipment
        .route("/equipment", get(equipment::list_equipment).post(equipment::create_equipment))
        .route(
            "/equipment/:id",
            get(equipment::get_equipment)
                .put(equipment::update_equipment)
                .delete(equipment::delete_equipment),
        )
        // Requests
        .route("/requests", get(requests::list_requests).post(requests::create_request))
        .route("/requests/overdue", get(requests::list_overdue))
        .route(
            "/requests/:id",
            get(requests::get_request)
                .put(requests::update_request)
                .delete(requests::delete_request),
        )
        .route("/requests/:id/status", put(requests::set_request_status))
        .route("/requests/:id/assign", put(requests::assign_request))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user).delete(users::delete_user))
        // Statistics
        .route("/stats/dashboard", get(stats::get_dashboard))
        .route("/reports/teams", get(stats::get_team_report))
        .route("/reports/equipment", get(stats::get_equipment_report))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .merge(site)
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
