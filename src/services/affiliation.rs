// Affiliation broker
// Independent dealers ask to join approved companies; company admins answer within their seat limit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::{JoinOutcome, MarketplaceStore, StoreError},
    middleware::AuthenticatedAccount,
    models::{Account, ApprovalStatus, Company, CompanyStatus, DealerProfile, JoinRequest},
    services::{
        approval::{ReviewAction, ReviewRequest},
        notifier::{DomainEvent, Notifier},
        policy,
    },
    utils::WorkflowError,
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCompanyRequest {
    pub company_id: Uuid,
}

/// Public directory entry for an approved company
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub company_id: String,
    pub name: String,
    pub city: String,
    pub address: String,
    pub description: String,
    pub website: Option<String>,
    pub total_dealers: i32,
    pub dealer_slots: i32,
    pub can_join: bool,
}

impl From<Company> for DirectoryEntry {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            dealer_slots: company.dealer_slots(),
            can_join: company.can_add_dealer(),
            company_id: company.external_id,
            name: company.name,
            city: company.city,
            address: company.address,
            description: company.description,
            website: company.website,
            total_dealers: company.total_dealers,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerSummary {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub business_name: String,
    pub license_number: String,
    pub city: String,
    pub years_of_experience: i32,
}

impl DealerSummary {
    fn new(profile: &DealerProfile, account: Option<&Account>) -> Self {
        Self {
            profile_id: profile.id,
            user_id: profile.account_id,
            name: account.map(|a| a.name.clone()).unwrap_or_default(),
            email: account.map(|a| a.email.clone()).unwrap_or_default(),
            phone: account.map(|a| a.phone.clone()).unwrap_or_default(),
            business_name: profile.business_name.clone(),
            license_number: profile.license_number.clone(),
            city: profile.city.clone(),
            years_of_experience: profile.years_of_experience,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJoinRequest {
    pub request_id: Uuid,
    pub dealer: DealerSummary,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyPendingRequests {
    pub requests: Vec<PendingJoinRequest>,
    pub dealer_limit: i32,
    pub current_dealers: i32,
    pub can_accept_more: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerJoinRequestView {
    pub request: Option<JoinRequest>,
    pub company_name: Option<String>,
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct AffiliationBroker {
    store: Arc<dyn MarketplaceStore>,
    notifier: Arc<dyn Notifier>,
}

impl AffiliationBroker {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    async fn dealer_profile(
        &self,
        caller: &AuthenticatedAccount,
    ) -> Result<DealerProfile, WorkflowError> {
        let account = self
            .store
            .find_account(caller.account_id)
            .await?
            .ok_or(WorkflowError::Unauthorized)?;
        if !account.is_dealer() {
            return Err(WorkflowError::NotADealer);
        }

        self.store
            .find_dealer_profile_by_account(account.id)
            .await?
            .ok_or(WorkflowError::ProfileRequired)
    }

    /// Approved companies, optionally filtered by name or city
    pub async fn companies_list(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>, WorkflowError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let companies = self
            .store
            .list_companies(CompanyStatus::Approved, search)
            .await?;

        Ok(companies.into_iter().map(DirectoryEntry::from).collect())
    }

    /// An independent dealer asks to join an approved company
    #[instrument(skip(self, request), fields(account_id = %caller.account_id, company_id = %request.company_id))]
    pub async fn request_join(
        &self,
        caller: &AuthenticatedAccount,
        request: JoinCompanyRequest,
    ) -> Result<JoinRequest, WorkflowError> {
        let profile = self.dealer_profile(caller).await?;

        if profile.company_id.is_some() {
            return Err(WorkflowError::AlreadyAffiliated);
        }
        if self
            .store
            .find_pending_join_request(profile.id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::JoinRequestExists);
        }

        let company = match self.store.find_company(request.company_id).await? {
            Some(company) if company.status.permits_affiliation() => company,
            _ => return Err(WorkflowError::CompanyUnavailable),
        };

        let join_request = self
            .store
            .create_join_request(&JoinRequest::new(profile.id, company.id))
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => WorkflowError::JoinRequestExists,
                other => other.into(),
            })?;

        info!(request_id = %join_request.id, "Join request created");

        self.notifier
            .notify(DomainEvent::JoinRequested {
                company_id: company.id,
                dealer_account_id: profile.account_id,
                business_name: profile.business_name,
            })
            .await;

        Ok(join_request)
    }

    /// The caller's most recent join request
    pub async fn dealer_request(
        &self,
        caller: &AuthenticatedAccount,
    ) -> Result<DealerJoinRequestView, WorkflowError> {
        let profile = self.dealer_profile(caller).await?;

        let request = self.store.latest_join_request(profile.id).await?;
        let company_name = match &request {
            Some(r) => self.store.find_company(r.company_id).await?.map(|c| c.name),
            None => None,
        };

        Ok(DealerJoinRequestView {
            request,
            company_name,
        })
    }

    /// Pending requests for the caller's company with its seat usage
    pub async fn get_company_pending_requests(
        &self,
        caller: &AuthenticatedAccount,
    ) -> Result<CompanyPendingRequests, WorkflowError> {
        let company_id = policy::manage_join_requests(caller)?;
        let company = self
            .store
            .find_company(company_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Company".to_string()))?;

        let pending = self.store.list_pending_join_requests(company_id).await?;
        let mut requests = Vec::with_capacity(pending.len());
        for request in pending {
            let Some(profile) = self.store.find_dealer_profile(request.dealer_profile_id).await?
            else {
                continue;
            };
            let account = self.store.find_account(profile.account_id).await?;
            requests.push(PendingJoinRequest {
                request_id: request.id,
                dealer: DealerSummary::new(&profile, account.as_ref()),
                requested_at: request.requested_at,
            });
        }

        Ok(CompanyPendingRequests {
            requests,
            dealer_limit: company.max_dealers,
            current_dealers: company.total_dealers,
            can_accept_more: company.can_add_dealer(),
        })
    }

    /// Accept or reject a pending request addressed to the caller's company
    #[instrument(skip(self, review), fields(responder = %caller.account_id, action = ?review.action))]
    pub async fn respond_to_join_request(
        &self,
        caller: &AuthenticatedAccount,
        request_id: Uuid,
        review: ReviewRequest,
    ) -> Result<JoinRequest, WorkflowError> {
        let company_id = policy::manage_join_requests(caller)?;

        let mut request = match self.store.find_join_request(request_id).await? {
            Some(r) if r.company_id == company_id && r.is_pending() => r,
            _ => return Err(WorkflowError::RequestNotFound),
        };
        let profile = self
            .store
            .find_dealer_profile(request.dealer_profile_id)
            .await?
            .ok_or(WorkflowError::RequestNotFound)?;
        let company = self
            .store
            .find_company(company_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Company".to_string()))?;

        let reason = review.reason();
        let outcome = review.action.outcome();

        let request = match review.action {
            ReviewAction::Approve => {
                if profile.company_id.is_some() {
                    return Err(WorkflowError::AlreadyAffiliated);
                }
                if !company.can_add_dealer() {
                    warn!(%request_id, "Join approval blocked by seat limit");
                    return Err(WorkflowError::SeatLimitReached);
                }

                request.resolve(outcome, caller.account_id, reason.clone());
                match self.store.accept_join_request(&request).await? {
                    JoinOutcome::Joined(request) => request,
                    JoinOutcome::LimitReached => {
                        warn!(%request_id, "Join approval lost the last seat");
                        return Err(WorkflowError::SeatLimitReached);
                    },
                    JoinOutcome::AlreadyAffiliated => {
                        warn!(%request_id, "Dealer joined another company meanwhile");
                        return Err(WorkflowError::AlreadyAffiliated);
                    },
                }
            },
            ReviewAction::Reject => {
                request.resolve(outcome, caller.account_id, reason.clone());
                self.store.save_join_request(&request).await?
            },
        };

        info!(%request_id, status = %request.status, "Join request answered");

        self.notifier
            .notify(DomainEvent::JoinRequestResolved {
                dealer_account_id: profile.account_id,
                company_name: company.name,
                outcome: request.status,
                reason,
            })
            .await;

        Ok(request)
    }
}
