// Approval workflow error handling
// One taxonomy for registration, onboarding, affiliation, approval and plans

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    db::StoreError,
    services::{email::EmailError, jwt::JwtError},
    utils::password::PasswordError,
};

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("A company with this email already exists")]
    DuplicateCompanyEmail,

    #[error("An account with the owner email already exists")]
    DuplicateOwnerEmail,

    #[error("Invalid assignment: {0}")]
    InvalidAssignment(String),

    #[error("No account found for this email")]
    AccountNotFound,

    #[error("Invalid or expired verification code. Please register again")]
    InvalidOrExpiredCode,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Registration incomplete. Please verify your email first")]
    RegistrationIncomplete,

    #[error("Only dealer accounts can perform this action")]
    NotADealer,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Join request not found")]
    RequestNotFound,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Dealer limit reached for the company's current plan")]
    SeatLimitReached,

    #[error("Plan limits are below current usage: {0}")]
    PlanExceedsUsage(String),

    #[error("Failed to send verification email")]
    NotificationFailure(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("A pending join request already exists")]
    JoinRequestExists,

    #[error("Dealer is already affiliated with a company")]
    AlreadyAffiliated,

    #[error("Company is not accepting dealers")]
    CompanyUnavailable,

    #[error("Complete your dealer profile first")]
    ProfileRequired,

    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => WorkflowError::NotFound("Record".to_string()),
            other => WorkflowError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for WorkflowError {
    fn from(err: PasswordError) -> Self {
        WorkflowError::Internal(err.to_string())
    }
}

impl From<JwtError> for WorkflowError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired | JwtError::InvalidToken(_) | JwtError::InvalidClaims(_) => {
                WorkflowError::Unauthorized
            },
            other => WorkflowError::Internal(other.to_string()),
        }
    }
}

impl From<EmailError> for WorkflowError {
    fn from(err: EmailError) -> Self {
        WorkflowError::NotificationFailure(err.to_string())
    }
}

impl From<validator::ValidationErrors> for WorkflowError {
    fn from(err: validator::ValidationErrors) -> Self {
        WorkflowError::Validation(crate::utils::validation::validation_message(&err))
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct WorkflowErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl WorkflowError {
    /// Get HTTP status code for error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Unauthorized => StatusCode::UNAUTHORIZED,

            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,

            WorkflowError::RequestNotFound | WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,

            WorkflowError::JoinRequestExists => StatusCode::CONFLICT,

            WorkflowError::NotificationFailure(_) | WorkflowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },

            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Get error code for API response
    pub fn error_code(&self) -> &'static str {
        match self {
            WorkflowError::DuplicateEmail => "DUPLICATE_EMAIL",
            WorkflowError::DuplicateCompanyEmail => "DUPLICATE_COMPANY_EMAIL",
            WorkflowError::DuplicateOwnerEmail => "DUPLICATE_OWNER_EMAIL",
            WorkflowError::InvalidAssignment(_) => "INVALID_ASSIGNMENT",
            WorkflowError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            WorkflowError::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            WorkflowError::InvalidCredentials => "INVALID_CREDENTIALS",
            WorkflowError::RegistrationIncomplete => "REGISTRATION_INCOMPLETE",
            WorkflowError::NotADealer => "NOT_A_DEALER",
            WorkflowError::Forbidden(_) => "FORBIDDEN",
            WorkflowError::RequestNotFound => "REQUEST_NOT_FOUND",
            WorkflowError::NotFound(_) => "NOT_FOUND",
            WorkflowError::SeatLimitReached => "SEAT_LIMIT_REACHED",
            WorkflowError::PlanExceedsUsage(_) => "PLAN_EXCEEDS_USAGE",
            WorkflowError::NotificationFailure(_) => "NOTIFICATION_FAILURE",
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::Unauthorized => "UNAUTHORIZED",
            WorkflowError::JoinRequestExists => "JOIN_REQUEST_EXISTS",
            WorkflowError::AlreadyAffiliated => "ALREADY_AFFILIATED",
            WorkflowError::CompanyUnavailable => "COMPANY_UNAVAILABLE",
            WorkflowError::ProfileRequired => "PROFILE_REQUIRED",
            WorkflowError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Infrastructure details never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            WorkflowError::Internal(_) => "Internal Server Error".to_string(),
            WorkflowError::NotificationFailure(_) => {
                "Failed to send verification email. Please try again".to_string()
            },
            other => other.to_string(),
        }
    }

    /// Create error response
    pub fn to_response(&self) -> WorkflowErrorResponse {
        WorkflowErrorResponse {
            success: false,
            error: self.error_code().to_string(),
            message: self.public_message(),
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            WorkflowError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
            },
            WorkflowError::NotificationFailure(detail) => {
                tracing::error!("Verification email delivery failed: {}", detail);
            },
            _ => {},
        }

        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// RESULT TYPE
// =============================================================================

pub type WorkflowResult<T> = Result<T, WorkflowError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            WorkflowError::DuplicateEmail.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WorkflowError::InvalidOrExpiredCode.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WorkflowError::SeatLimitReached.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WorkflowError::Forbidden("x".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WorkflowError::RequestNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WorkflowError::NotificationFailure("smtp".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WorkflowError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(WorkflowError::NotADealer.error_code(), "NOT_A_DEALER");
        assert_eq!(
            WorkflowError::PlanExceedsUsage("dealers".to_string()).error_code(),
            "PLAN_EXCEEDS_USAGE"
        );
        assert_eq!(
            WorkflowError::InvalidCredentials.error_code(),
            "INVALID_CREDENTIALS"
        );
    }

    #[test]
    fn test_internal_details_do_not_leak() {
        let response = WorkflowError::Internal("connection refused at 10.0.0.5".to_string())
            .to_response();

        assert!(!response.success);
        assert_eq!(response.error, "INTERNAL_ERROR");
        assert_eq!(response.message, "Internal Server Error");
    }

    #[test]
    fn test_credentials_message_is_generic() {
        // Same text whether the email is unknown or the password is wrong
        assert_eq!(
            WorkflowError::InvalidCredentials.public_message(),
            "Invalid email or password"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: WorkflowError = StoreError::Pool("timeout".to_string()).into();
        assert!(matches!(err, WorkflowError::Internal(_)));

        let err: WorkflowError = StoreError::NotFound.into();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }
}
