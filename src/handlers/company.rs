// Company registration and administration handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Json, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{json_body, query_params, respond};
use crate::{
    app::AppState,
    middleware::AuthenticatedAccount,
    services::company::{RegisterCompanyRequest, UpdateCompanyStatusRequest, VerifyOwnerRequest},
    utils::WorkflowError,
};

#[derive(Debug, Default, Deserialize)]
pub struct CompanySearch {
    pub search: Option<String>,
}

/// POST /company/register - Pending company plus unverified owner
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterCompanyRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let registration = state.companies.register_company(request).await?;

    Ok(respond(
        StatusCode::CREATED,
        "Company registered. A verification code has been sent to the owner's email",
        registration,
    ))
}

/// POST /company/verify-owner
pub async fn verify_owner(
    State(state): State<AppState>,
    body: Result<Json<VerifyOwnerRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let registration = state.companies.verify_company_owner(request).await?;

    Ok(respond(
        StatusCode::OK,
        "Owner verified. The company is awaiting platform approval",
        registration,
    ))
}

/// GET /company/pending?search=
pub async fn pending_companies(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    query: Result<Query<CompanySearch>, QueryRejection>,
) -> Result<Response, WorkflowError> {
    let CompanySearch { search } = query_params(query)?;
    let companies = state
        .companies
        .list_pending(&caller, search.as_deref())
        .await?;

    Ok(respond(StatusCode::OK, "Pending companies retrieved", companies))
}

/// PATCH /company/{company_id}/status
pub async fn update_status(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(company_id): Path<Uuid>,
    body: Result<Json<UpdateCompanyStatusRequest>, JsonRejection>,
) -> Result<Response, WorkflowError> {
    let request = json_body(body)?;
    let company = state
        .companies
        .update_status(&caller, company_id, request)
        .await?;

    let message = format!("Company status updated to {}", company.company.status);
    Ok(respond(StatusCode::OK, message, company))
}

/// GET /company/me
pub async fn my_company(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
) -> Result<Response, WorkflowError> {
    let company = state.companies.get_own(&caller).await?;
    Ok(respond(StatusCode::OK, "Company retrieved", company))
}

/// GET /company/{company_id}
pub async fn get_company(
    State(state): State<AppState>,
    caller: AuthenticatedAccount,
    Path(company_id): Path<Uuid>,
) -> Result<Response, WorkflowError> {
    let company = state.companies.get_any(&caller, company_id).await?;
    Ok(respond(StatusCode::OK, "Company retrieved", company))
}
