// Authentication middleware for protected routes
// Validates the bearer token, re-resolves the account and injects AuthenticatedAccount

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};

use crate::{
    app::AppState, middleware::auth::AuthenticatedAccount, services::JwtService,
    utils::WorkflowError,
};

/// Resolve the caller behind a bearer token.
/// Tokens for deleted, unverified or re-roled accounts are refused.
async fn resolve(state: &AppState, token: &str) -> Result<AuthenticatedAccount, WorkflowError> {
    let claims = state.jwt_service.validate_access_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        WorkflowError::Unauthorized
    })?;
    let (account_id, role) = JwtService::principal(&claims)?;

    let account = state
        .store
        .find_account(account_id)
        .await?
        .ok_or(WorkflowError::Unauthorized)?;

    if !account.verified || account.role != role {
        tracing::warn!(%account_id, "Token no longer matches its account");
        return Err(WorkflowError::Unauthorized);
    }

    Ok(AuthenticatedAccount::from(&account))
}

/// Middleware that adds AuthenticatedAccount to request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let Ok(TypedHeader(Authorization(bearer))) = bearer else {
        return WorkflowError::Unauthorized.into_response();
    };

    match resolve(&state, bearer.token()).await {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        },
        Err(e) => e.into_response(),
    }
}

/// Handlers take `AuthenticatedAccount` directly
impl<S> FromRequestParts<S> for AuthenticatedAccount
where
    S: Send + Sync,
{
    type Rejection = WorkflowError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedAccount>()
            .copied()
            .ok_or(WorkflowError::Unauthorized)
    }
}
