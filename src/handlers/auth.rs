// Authentication handlers
// Registration with one-time codes, login, dealer onboarding and dealer review

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Json, Response},
};
use uuid::Uuid;

use super::{json_body, respond};
use crate::{
    app::AppState,
    middleware::AuthenticatedAccount,
    models::DealerProfileData,
    services::{
        approval::ReviewRequest,
        identity::{LoginRequest, RegisterRequest, ResendOtpRequest, VerifyOtpRequest},
    },
    utils::WorkflowError,
};

// =============================================================================
// REGISTRATION AND LOGIN
// =============================================================================

/// POST /auth/register - Create an unverified dealer or user and send a code
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let registered = state.identity.register(request).await?;
    let message = registered.message.clone();

    Ok(respond(StatusCode::CREATED, message, registered))
}

/// POST /auth/verify-otp - Confirm the code and sign in
pub async fn verify_otp(
    State(state): State<AppState>,
    body: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let verified = state.identity.verify_otp(request).await?;
    let message = verified.message.clone();

    Ok(respond(StatusCode::OK, message, verified))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let session = state.identity.login(request).await?;

    Ok(respond(StatusCode::OK, "Login successful", session))
}

/// POST /auth/resend-otp - Fresh code for a pending registration
pub async fn resend_otp(
    State(state): State<AppState>,
    body: Result<Json<ResendOtpRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    state.identity.resend_otp(request).await?;

    Ok(respond(
        StatusCode::OK,
        "A new verification code has been sent to your email",
        (),
    ))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
) -> Result<Response, WorkflowError> {
    let me = state.identity.me(&caller).await?;
    Ok(respond(StatusCode::OK, "Account retrieved", me))
}

// =============================================================================
// DEALER ONBOARDING
// =============================================================================

/// GET /auth/dealer/status
pub async fn dealer_status(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
) -> Result<Response, WorkflowError> {
    let report = state.onboarding.check_dealer_status(&caller).await?;
    Ok(respond(StatusCode::OK, "Dealer status retrieved", report))
}

/// POST /auth/dealer/profile - Submit or resubmit the dealer profile
pub async fn complete_dealer_profile(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    body: Result<Json<DealerProfileData>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let data = json_body(body)?;
    let submitted = state
        .onboarding
        .complete_dealer_profile(&caller, data)
        .await?;

    Ok(respond(
        StatusCode::OK,
        "Dealer profile submitted for approval",
        submitted,
    ))
}

// =============================================================================
// DEALER REVIEW
// =============================================================================

/// GET /auth/admin/dealers/pending
pub async fn pending_dealers(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
) -> Result<Response, WorkflowError> {
    let pending = state.approval.get_pending_dealers(&caller).await?;
    Ok(respond(StatusCode::OK, "Pending dealers retrieved", pending))
}

/// PUT /auth/admin/dealers/{dealer_id} - Approve or reject a dealer profile
pub async fn review_dealer(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(dealer_id): Path<Uuid>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let review = json_body(body)?;
    let profile = state
        .approval
        .approve_dealer(&caller, dealer_id, review)
        .await?;

    let message = format!("Dealer {}", profile.approval_status);
    Ok(respond(StatusCode::OK, message, profile))
}
