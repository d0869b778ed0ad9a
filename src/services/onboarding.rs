// Dealer onboarding
// A verified dealer submits a business profile; every submission re-enters review

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    db::MarketplaceStore,
    middleware::AuthenticatedAccount,
    models::{Account, ApprovalStatus, DealerProfile, DealerProfileData},
    services::{
        identity::PROFILE_INCOMPLETE,
        notifier::{DomainEvent, Notifier},
    },
    utils::WorkflowError,
};

pub const PENDING_APPROVAL: &str = "pending_approval";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileResponse {
    pub dealer_profile: DealerProfile,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerStatusReport {
    pub has_dealer_profile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_profile: Option<DealerProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by_name: Option<String>,
}

#[derive(Clone)]
pub struct DealerOnboarding {
    store: Arc<dyn MarketplaceStore>,
    notifier: Arc<dyn Notifier>,
}

impl DealerOnboarding {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    async fn dealer_account(&self, caller: &AuthenticatedAccount) -> Result<Account, WorkflowError> {
        let account = self
            .store
            .find_account(caller.account_id)
            .await?
            .ok_or(WorkflowError::Unauthorized)?;

        if !account.is_dealer() {
            return Err(WorkflowError::NotADealer);
        }
        Ok(account)
    }

    /// Create the caller's profile, or overwrite it and send it back to review
    #[instrument(skip(self, data), fields(account_id = %caller.account_id))]
    pub async fn complete_dealer_profile(
        &self,
        caller: &AuthenticatedAccount,
        data: DealerProfileData,
    ) -> Result<CompleteProfileResponse, WorkflowError> {
        let account = self.dealer_account(caller).await?;
        data.validate()?;

        let (profile, resubmission) =
            match self.store.find_dealer_profile_by_account(account.id).await? {
                Some(mut profile) => {
                    profile.resubmit(data);
                    (self.store.save_dealer_profile(&profile).await?, true)
                },
                None => {
                    if let Some(company_id) = account.company_id {
                        let usable = self
                            .store
                            .find_company(company_id)
                            .await?
                            .is_some_and(|c| c.status.permits_affiliation());
                        if !usable {
                            return Err(WorkflowError::CompanyUnavailable);
                        }
                    }

                    let profile = DealerProfile::new(account.id, account.company_id, data);
                    (self.store.create_dealer_profile(&profile).await?, false)
                },
            };

        info!(
            profile_id = %profile.id,
            resubmission,
            "Dealer profile submitted for review"
        );

        self.notifier
            .notify(DomainEvent::DealerProfileSubmitted {
                dealer_account_id: account.id,
                company_id: profile.company_id,
                business_name: profile.business_name.clone(),
                resubmission,
            })
            .await;

        Ok(CompleteProfileResponse {
            dealer_profile: profile,
            status: PENDING_APPROVAL,
        })
    }

    /// Read-only view of the caller's onboarding progress
    pub async fn check_dealer_status(
        &self,
        caller: &AuthenticatedAccount,
    ) -> Result<DealerStatusReport, WorkflowError> {
        let account = self.dealer_account(caller).await?;

        let Some(profile) = self.store.find_dealer_profile_by_account(account.id).await? else {
            return Ok(DealerStatusReport {
                has_dealer_profile: false,
                approval_status: None,
                status: Some(PROFILE_INCOMPLETE),
                dealer_profile: None,
                company_name: None,
                approved_by_name: None,
            });
        };

        let company_name = match profile.company_id {
            Some(company_id) => self.store.find_company(company_id).await?.map(|c| c.name),
            None => None,
        };
        let approved_by_name = match profile.approved_by {
            Some(approver) => self.store.find_account(approver).await?.map(|a| a.name),
            None => None,
        };

        Ok(DealerStatusReport {
            has_dealer_profile: true,
            approval_status: Some(profile.approval_status),
            status: None,
            dealer_profile: Some(profile),
            company_name,
            approved_by_name,
        })
    }
}
