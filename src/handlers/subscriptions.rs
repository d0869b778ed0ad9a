// Plan and subscription handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{Json, Response},
};

use super::{json_body, query_params, respond};
use crate::{
    app::AppState,
    middleware::AuthenticatedAccount,
    services::subscription::{
        AssignPlanRequest, ChangePlanRequest, CheckLimitsQuery, CreatePlanRequest,
    },
    utils::WorkflowError,
};

/// GET /subscriptions/plans
pub async fn list_plans(State(state): State<AppState>) -> Result<Response, WorkflowError> {
    let plans = state.subscriptions.list_plans().await?;
    Ok(respond(StatusCode::OK, "Plans retrieved", plans))
}

/// POST /subscriptions/plans
pub async fn create_plan(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    body: Result<Json<CreatePlanRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let plan = state.subscriptions.create_plan(&caller, request).await?;

    Ok(respond(StatusCode::CREATED, "Plan created", plan))
}

/// POST /subscriptions/assign-plan
pub async fn assign_plan(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    body: Result<Json<AssignPlanRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let change = state.subscriptions.assign_plan(&caller, request).await?;

    Ok(respond(StatusCode::OK, "Plan assigned to company", change))
}

/// POST /subscriptions/change-plan
pub async fn change_plan(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    body: Result<Json<ChangePlanRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let change = state.subscriptions.change_plan(&caller, request).await?;

    Ok(respond(StatusCode::OK, "Plan changed", change))
}

/// GET /subscriptions/check-limits?action=add_dealer|add_property
pub async fn check_limits(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    query: Result<Query<CheckLimitsQuery>, QueryRejection>,
) -> Result<Response, WorkflowError> {
    let CheckLimitsQuery { action } = query_params(query)?;
    let check = state.subscriptions.check_limits(&caller, action).await?;
    let message = check.message.clone();

    Ok(respond(StatusCode::OK, message, check))
}

/// GET /subscriptions/company
pub async fn company_subscription(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
) -> Result<Response, WorkflowError> {
    let overview = state.subscriptions.company_subscription(&caller).await?;
    Ok(respond(StatusCode::OK, "Subscription retrieved", overview))
}
