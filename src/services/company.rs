// Company registrar
// A prospective company and its owner account are created, confirmed and discarded together

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_config::WorkflowConfig,
    db::{MarketplaceStore, StoreError},
    middleware::AuthenticatedAccount,
    models::{
        company::NewCompany, Account, Company, CompanyStatus, PlanLimitations, Role,
    },
    services::{
        email::EmailService,
        notifier::{DomainEvent, Notifier},
        otp, policy,
    },
    utils::{normalize_email, trim_optional_field, PasswordService, WorkflowError},
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFields {
    #[validate(length(min = 1, max = 255, message = "Company name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid company email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 32, message = "Company phone is required"))]
    pub phone: String,

    #[validate(length(min = 1, max = 100, message = "License number is required"))]
    pub license_number: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub city: String,

    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OwnerFields {
    #[validate(length(min = 1, max = 255, message = "Owner name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid owner email format"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be between 6 and 128 characters"
    ))]
    pub password: String,

    #[validate(length(min = 1, max = 32, message = "Owner phone is required"))]
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterCompanyRequest {
    #[validate]
    pub company: CompanyFields,
    #[validate]
    pub owner: OwnerFields,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyOwnerRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Verification code is required"))]
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCompanyStatusRequest {
    pub status: CompanyStatus,
    pub reason: Option<String>,
}

/// Company as returned to clients, with its limit snapshot and derived capacity
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyView {
    #[serde(flatten)]
    pub company: Company,
    pub plan_limitations: PlanLimitations,
    pub can_add_dealer: bool,
    pub can_add_property: bool,
    pub dealer_slots: i32,
}

impl From<Company> for CompanyView {
    fn from(company: Company) -> Self {
        Self {
            plan_limitations: company.plan_limitations(),
            can_add_dealer: company.can_add_dealer(),
            can_add_property: company.can_add_property(),
            dealer_slots: company.dealer_slots(),
            company,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompanyRegistration {
    pub company: CompanyView,
    pub owner: Account,
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct CompanyRegistrar {
    store: Arc<dyn MarketplaceStore>,
    passwords: PasswordService,
    email: EmailService,
    notifier: Arc<dyn Notifier>,
    settings: WorkflowConfig,
}

impl CompanyRegistrar {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        passwords: PasswordService,
        email: EmailService,
        notifier: Arc<dyn Notifier>,
        settings: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            passwords,
            email,
            notifier,
            settings,
        }
    }

    fn trial_limits(&self) -> PlanLimitations {
        PlanLimitations {
            max_dealers: self.settings.trial_max_dealers,
            max_properties: self.settings.trial_max_properties,
            features: Vec::new(),
        }
    }

    /// Create a pending company with an unverified owner and mail the owner a code
    #[instrument(skip(self, request), fields(company = %request.company.email, owner = %request.owner.email))]
    pub async fn register_company(
        &self,
        request: RegisterCompanyRequest,
    ) -> Result<CompanyRegistration, WorkflowError> {
        request.validate()?;
        let RegisterCompanyRequest {
            company: fields,
            owner: owner_fields,
        } = request;

        let company_email = normalize_email(&fields.email);
        let owner_email = normalize_email(&owner_fields.email);

        if self.store.find_company_by_email(&company_email).await?.is_some() {
            return Err(WorkflowError::DuplicateCompanyEmail);
        }
        if self.store.find_account_by_email(&owner_email).await?.is_some() {
            return Err(WorkflowError::DuplicateOwnerEmail);
        }

        let ttl = self.settings.company_owner_otp_ttl_seconds;
        let code = otp::OneTimeCode::issue(ttl, Utc::now());
        let password_hash = self.passwords.hash(&owner_fields.password)?;

        let mut owner = Account::new_unverified(
            owner_fields.name.trim().to_string(),
            owner_email,
            owner_fields.phone.trim().to_string(),
            password_hash,
            Role::CompanyAdmin,
            None,
            code.code.clone(),
            code.expires_at,
        );

        let company = Company::new(
            NewCompany {
                name: fields.name.trim().to_string(),
                email: company_email,
                phone: fields.phone.trim().to_string(),
                license_number: fields.license_number.trim().to_string(),
                address: fields.address,
                city: fields.city,
                website: fields.website,
                description: fields.description,
            },
            owner.id,
            self.trial_limits(),
        );
        owner.company_id = Some(company.id);

        self.store
            .create_company_with_owner(&company, &owner)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(constraint) if constraint.contains("compan") => {
                    WorkflowError::DuplicateCompanyEmail
                },
                StoreError::Conflict(_) => WorkflowError::DuplicateOwnerEmail,
                other => other.into(),
            })?;

        info!(company_id = %company.id, "Company registered, awaiting owner verification");

        self.email
            .send_otp(&owner.email, &owner.name, &code.code, ttl)
            .await?;

        Ok(CompanyRegistration {
            company: company.into(),
            owner,
        })
    }

    /// Confirm the owner. A wrong or expired code deletes both owner and company.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn verify_company_owner(
        &self,
        request: VerifyOwnerRequest,
    ) -> Result<CompanyRegistration, WorkflowError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let mut owner = self
            .store
            .find_account_by_email(&email)
            .await?
            .ok_or(WorkflowError::AccountNotFound)?;

        if owner.role != Role::CompanyAdmin {
            return Err(WorkflowError::Validation(
                "Account is not a company owner".to_string(),
            ));
        }
        if owner.verified {
            return Err(WorkflowError::InvalidOrExpiredCode);
        }

        let company_id = owner
            .company_id
            .ok_or_else(|| WorkflowError::NotFound("Company".to_string()))?;

        if !otp::accepts(
            owner.otp.as_deref(),
            owner.otp_expires,
            &request.otp,
            Utc::now(),
        ) {
            warn!(%company_id, "Owner verification failed, discarding company and owner");
            self.store
                .delete_company_with_owner(company_id, owner.id)
                .await?;
            return Err(WorkflowError::InvalidOrExpiredCode);
        }

        owner.verified = true;
        owner.otp = None;
        owner.otp_expires = None;
        owner.updated_at = Utc::now();
        let owner = self.store.save_account(&owner).await?;

        let company = self
            .store
            .find_company(company_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Company".to_string()))?;

        info!(%company_id, "Company owner verified");

        self.notifier
            .notify(DomainEvent::CompanyOwnerVerified { company_id })
            .await;

        Ok(CompanyRegistration {
            company: company.into(),
            owner,
        })
    }

    /// Companies waiting for a super admin decision
    pub async fn list_pending(
        &self,
        caller: &AuthenticatedAccount,
        search: Option<&str>,
    ) -> Result<Vec<CompanyView>, WorkflowError> {
        policy::manage_companies(caller)?;

        let companies = self
            .store
            .list_companies(CompanyStatus::Pending, search)
            .await?;
        Ok(companies.into_iter().map(CompanyView::from).collect())
    }

    /// Set a company's status. Dealers and counters are left alone.
    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn update_status(
        &self,
        caller: &AuthenticatedAccount,
        company_id: Uuid,
        request: UpdateCompanyStatusRequest,
    ) -> Result<CompanyView, WorkflowError> {
        policy::manage_companies(caller)?;

        if self.store.find_company(company_id).await?.is_none() {
            return Err(WorkflowError::NotFound("Company".to_string()));
        }

        let reason = trim_optional_field(request.reason.as_ref());

        let company = self
            .store
            .update_company_status(company_id, request.status, reason.clone())
            .await?;

        info!(%company_id, "Company status changed");

        self.notifier
            .notify(DomainEvent::CompanyStatusChanged {
                company_id,
                status: request.status,
                reason,
            })
            .await;

        Ok(company.into())
    }

    /// The caller's own company
    pub async fn get_own(&self, caller: &AuthenticatedAccount) -> Result<CompanyView, WorkflowError> {
        let company_id = policy::view_own_company(caller)?;
        self.load(company_id).await
    }

    /// Any company, for super admins
    pub async fn get_any(
        &self,
        caller: &AuthenticatedAccount,
        company_id: Uuid,
    ) -> Result<CompanyView, WorkflowError> {
        policy::manage_companies(caller)?;
        self.load(company_id).await
    }

    async fn load(&self, company_id: Uuid) -> Result<CompanyView, WorkflowError> {
        self.store
            .find_company(company_id)
            .await?
            .map(CompanyView::from)
            .ok_or_else(|| WorkflowError::NotFound("Company".to_string()))
    }
}
