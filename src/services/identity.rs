// Identity registrar
// Unverified accounts bound to a one-time code; nothing is usable until the code is confirmed

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_config::WorkflowConfig,
    db::MarketplaceStore,
    middleware::AuthenticatedAccount,
    models::{account::derive_external_id, Account, ApprovalStatus, Role},
    services::{email::EmailService, jwt::JwtService, otp},
    utils::{normalize_email, PasswordService, WorkflowError},
};

/// Reported for dealers that have verified but not yet submitted a profile
pub const PROFILE_INCOMPLETE: &str = "profile_incomplete";

fn default_role() -> Role {
    Role::User
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be between 6 and 128 characters"
    ))]
    pub password: String,

    #[validate(length(min = 1, max = 32, message = "Phone is required"))]
    pub phone: String,

    #[serde(default = "default_role")]
    pub role: Role,

    pub company_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Verification code is required"))]
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub message: String,
    pub user: Account,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_status: Option<&'static str>,
}

/// Dealer onboarding progress as seen at sign-in
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DealerStatus {
    pub has_profile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: Account,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_status: Option<DealerStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_status: Option<DealerStatus>,
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct IdentityRegistrar {
    store: Arc<dyn MarketplaceStore>,
    passwords: PasswordService,
    jwt: JwtService,
    email: EmailService,
    settings: WorkflowConfig,
}

impl IdentityRegistrar {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        passwords: PasswordService,
        jwt: JwtService,
        email: EmailService,
        settings: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            passwords,
            jwt,
            email,
            settings,
        }
    }

    /// Create or refresh an unverified account and mail it a one-time code
    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<RegisterResponse, WorkflowError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let role = request.role;

        if !role.is_self_registrable() {
            return Err(WorkflowError::InvalidAssignment(format!(
                "role '{}' cannot be chosen at registration",
                role
            )));
        }

        if let Some(company_id) = request.company_id {
            if role != Role::Dealer {
                return Err(WorkflowError::InvalidAssignment(
                    "only dealers can be assigned to a company".to_string(),
                ));
            }
            match self.store.find_company(company_id).await? {
                Some(company) if company.status.permits_affiliation() => {},
                _ => {
                    return Err(WorkflowError::InvalidAssignment(
                        "company does not exist or is not approved".to_string(),
                    ))
                },
            }
        }

        let password_hash = self.passwords.hash(&request.password)?;
        let code = otp::OneTimeCode::issue(self.settings.otp_ttl_seconds, Utc::now());

        let account = match self.store.find_account_by_email(&email).await? {
            Some(existing) if existing.verified => return Err(WorkflowError::DuplicateEmail),
            // A pending company owner belongs to the company registrar
            Some(existing) if existing.role == Role::CompanyAdmin => {
                return Err(WorkflowError::DuplicateEmail)
            },
            Some(mut existing) => {
                existing.name = request.name.trim().to_string();
                existing.phone = request.phone.trim().to_string();
                existing.external_id = derive_external_id(&existing.email, &existing.phone);
                existing.password_hash = password_hash;
                existing.role = role;
                existing.company_id = request.company_id;
                existing.otp = Some(code.code.clone());
                existing.otp_expires = Some(code.expires_at);
                existing.updated_at = Utc::now();

                info!("Refreshing pending registration");
                self.store.save_account(&existing).await?
            },
            None => {
                let account = Account::new_unverified(
                    request.name.trim().to_string(),
                    email.clone(),
                    request.phone.trim().to_string(),
                    password_hash,
                    role,
                    request.company_id,
                    code.code.clone(),
                    code.expires_at,
                );

                info!("Creating pending registration");
                self.store
                    .create_account(&account)
                    .await
                    .map_err(|e| match e {
                        crate::db::StoreError::Conflict(_) => WorkflowError::DuplicateEmail,
                        other => other.into(),
                    })?
            },
        };

        self.email
            .send_otp(
                &account.email,
                &account.name,
                &code.code,
                self.settings.otp_ttl_seconds,
            )
            .await?;

        Ok(RegisterResponse {
            message: "Verification code sent to your email".to_string(),
            role: account.role,
        })
    }

    /// Confirm a pending registration. A wrong or expired code deletes the account.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn verify_otp(
        &self,
        request: VerifyOtpRequest,
    ) -> Result<VerifyOtpResponse, WorkflowError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let mut account = self
            .store
            .find_account_by_email(&email)
            .await?
            .ok_or(WorkflowError::AccountNotFound)?;

        if account.verified {
            return Err(WorkflowError::InvalidOrExpiredCode);
        }

        if account.role == Role::CompanyAdmin {
            return Err(WorkflowError::Validation(
                "Company owners verify through company owner verification".to_string(),
            ));
        }

        if !otp::accepts(
            account.otp.as_deref(),
            account.otp_expires,
            &request.otp,
            Utc::now(),
        ) {
            warn!("Verification failed, discarding pending account");
            self.store.delete_account(account.id).await?;
            return Err(WorkflowError::InvalidOrExpiredCode);
        }

        account.verified = true;
        account.otp = None;
        account.otp_expires = None;
        account.updated_at = Utc::now();
        let account = self.store.save_account(&account).await?;

        let token = self.jwt.generate_access_token(account.id, account.role)?;
        info!(account_id = %account.id, "Account verified");

        Ok(VerifyOtpResponse {
            message: "Email verified successfully".to_string(),
            dealer_status: account.is_dealer().then_some(PROFILE_INCOMPLETE),
            user: account,
            token,
        })
    }

    /// Password sign-in for verified accounts
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, WorkflowError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let account = match self.store.find_account_by_email(&email).await? {
            Some(account) => account,
            None => {
                warn!("Login attempt for unknown email");
                return Err(WorkflowError::InvalidCredentials);
            },
        };

        if !self
            .passwords
            .verify(&request.password, &account.password_hash)?
        {
            warn!(account_id = %account.id, "Login attempt with wrong password");
            return Err(WorkflowError::InvalidCredentials);
        }

        if !account.verified {
            return Err(WorkflowError::RegistrationIncomplete);
        }

        let token = self.jwt.generate_access_token(account.id, account.role)?;
        let dealer_status = self.dealer_status(&account).await?;
        info!(account_id = %account.id, "Login successful");

        Ok(LoginResponse {
            user: account,
            token,
            dealer_status,
        })
    }

    /// Issue and mail a fresh code to a pending account
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn resend_otp(&self, request: ResendOtpRequest) -> Result<(), WorkflowError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let mut account = self
            .store
            .find_account_by_email(&email)
            .await?
            .ok_or(WorkflowError::AccountNotFound)?;

        if account.verified {
            return Err(WorkflowError::Validation(
                "Account is already verified".to_string(),
            ));
        }

        let ttl = match account.role {
            Role::CompanyAdmin => self.settings.company_owner_otp_ttl_seconds,
            _ => self.settings.otp_ttl_seconds,
        };
        let code = otp::OneTimeCode::issue(ttl, Utc::now());

        account.otp = Some(code.code.clone());
        account.otp_expires = Some(code.expires_at);
        account.updated_at = Utc::now();
        let account = self.store.save_account(&account).await?;

        self.email
            .send_otp(&account.email, &account.name, &code.code, ttl)
            .await?;

        info!("Verification code reissued");
        Ok(())
    }

    /// The caller's account with dealer progress
    pub async fn me(&self, caller: &AuthenticatedAccount) -> Result<MeResponse, WorkflowError> {
        let account = self
            .store
            .find_account(caller.account_id)
            .await?
            .ok_or(WorkflowError::Unauthorized)?;

        let dealer_status = self.dealer_status(&account).await?;

        Ok(MeResponse {
            user: account,
            dealer_status,
        })
    }

    async fn dealer_status(&self, account: &Account) -> Result<Option<DealerStatus>, WorkflowError> {
        if !account.is_dealer() {
            return Ok(None);
        }

        let status = match self.store.find_dealer_profile_by_account(account.id).await? {
            Some(profile) => DealerStatus {
                has_profile: true,
                approval_status: Some(profile.approval_status),
                status: None,
            },
            None => DealerStatus {
                has_profile: false,
                approval_status: None,
                status: Some(PROFILE_INCOMPLETE),
            },
        };

        Ok(Some(status))
    }
}
