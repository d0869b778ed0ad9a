// HTTP handlers and route builders
// Protected routers take the state so they can layer the auth middleware

pub mod auth;
pub mod company;
pub mod company_join;
pub mod subscriptions;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post, put},
    Router,
};
use serde::Serialize;

use crate::{app::AppState, middleware::auth_middleware, utils::WorkflowError};

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

pub(crate) fn respond<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: T,
) -> Response {
    let response = ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
    };
    (status, Json(response)).into_response()
}

/// Unwrap a JSON body, turning extractor rejections into the error envelope
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, WorkflowError> {
    body.map(|Json(value)| value).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        WorkflowError::Validation(e.body_text())
    })
}

pub(crate) fn query_params<T>(
    query: Result<axum::extract::Query<T>, QueryRejection>,
) -> Result<T, WorkflowError> {
    query
        .map(|axum::extract::Query(value)| value)
        .map_err(|e| WorkflowError::Validation(e.body_text()))
}

// Authentication, dealer onboarding and dealer review routes
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(auth::me))
        .route("/dealer/status", get(auth::dealer_status))
        .route("/dealer/profile", post(auth::complete_dealer_profile))
        .route("/admin/dealers/pending", get(auth::pending_dealers))
        .route("/admin/dealers/{dealer_id}", put(auth::review_dealer))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(auth::register))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .route("/resend-otp", post(auth::resend_otp))
        .merge(protected)
}

// Company registration and administration
pub fn company_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/pending", get(company::pending_companies))
        .route("/me", get(company::my_company))
        .route("/{company_id}", get(company::get_company))
        .route("/{company_id}/status", patch(company::update_status))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(company::register))
        .route("/verify-owner", post(company::verify_owner))
        .merge(protected)
}

// Dealer affiliation requests
pub fn company_join_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/request", post(company_join::request_join))
        .route("/dealer/request", get(company_join::dealer_request))
        .route("/company/pending", get(company_join::company_pending))
        .route(
            "/company/respond/{request_id}",
            post(company_join::respond_to_request),
        )
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/companies-list", get(company_join::companies_list))
        .merge(protected)
}

// Plans and company subscriptions
pub fn subscription_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/assign-plan", post(subscriptions::assign_plan))
        .route("/change-plan", post(subscriptions::change_plan))
        .route("/check-limits", get(subscriptions::check_limits))
        .route("/company", get(subscriptions::company_subscription))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    // Listing plans is public, creating one is not
    let plans = get(subscriptions::list_plans).merge(
        post(subscriptions::create_plan)
            .route_layer(from_fn_with_state(state, auth_middleware)),
    );

    Router::new().route("/plans", plans).merge(protected)
}
