// Company join request handlers
// Directory lookup, dealer requests and company-side answers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Json, Response},
};
use uuid::Uuid;

use super::{company::CompanySearch, json_body, query_params, respond};
use crate::{
    app::AppState,
    middleware::AuthenticatedAccount,
    services::{affiliation::JoinCompanyRequest, approval::ReviewRequest},
    utils::WorkflowError,
};

/// GET /company-join/companies-list?search=
pub async fn companies_list(
    State(state): State<AppState>,
    query: Result<Query<CompanySearch>, QueryRejection>,
) -> Result<Response, WorkflowError> {
    let CompanySearch { search } = query_params(query)?;
    let companies = state.affiliation.companies_list(search.as_deref()).await?;

    Ok(respond(StatusCode::OK, "Companies retrieved", companies))
}

/// POST /company-join/request
pub async fn request_join(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    body: Result<Json<JoinCompanyRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let join_request = state.affiliation.request_join(&caller, request).await?;

    Ok(respond(
        StatusCode::CREATED,
        "Join request sent to the company",
        join_request,
    ))
}

/// GET /company-join/dealer/request
pub async fn dealer_request(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
) -> Result<Response, WorkflowError> {
    let view = state.affiliation.dealer_request(&caller).await?;
    Ok(respond(StatusCode::OK, "Join request retrieved", view))
}

/// GET /company-join/company/pending
pub async fn company_pending(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
) -> Result<Response, WorkflowError> {
    let pending = state
        .affiliation
        .get_company_pending_requests(&caller)
        .await?;

    Ok(respond(StatusCode::OK, "Pending join requests retrieved", pending))
}

/// POST /company-join/company/respond/{request_id}
pub async fn respond_to_request(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(request_id): Path<Uuid>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let review = json_body(body)?;
    let request = state
        .affiliation
        .respond_to_join_request(&caller, request_id, review)
        .await?;

    let message = format!("Join request {}", request.status);
    Ok(respond(StatusCode::OK, message, request))
}
