// Approval authority
// Affiliated dealers are reviewed by their company's admin, independent dealers by a super admin

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::{MarketplaceStore, SeatClaim},
    middleware::AuthenticatedAccount,
    models::{ApprovalStatus, DealerProfile},
    services::{
        notifier::{DomainEvent, Notifier},
        policy,
    },
    utils::{trim_optional_field, WorkflowError},
};

/// Outcome chosen by a reviewer
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn outcome(&self) -> ApprovalStatus {
        match self {
            ReviewAction::Approve => ApprovalStatus::Approved,
            ReviewAction::Reject => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ReviewRequest {
    /// Trimmed reason, `None` when blank
    pub fn reason(&self) -> Option<String> {
        trim_optional_field(self.reason.as_ref())
    }
}

#[derive(Debug, Serialize)]
pub struct DealerContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDealer {
    #[serde(flatten)]
    pub profile: DealerProfile,
    pub dealer: Option<DealerContact>,
    pub company_name: Option<String>,
}

#[derive(Clone)]
pub struct ApprovalAuthority {
    store: Arc<dyn MarketplaceStore>,
    notifier: Arc<dyn Notifier>,
}

impl ApprovalAuthority {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Review queue: one company's dealers for its admin, everyone for a super admin
    pub async fn get_pending_dealers(
        &self,
        caller: &AuthenticatedAccount,
    ) -> Result<Vec<PendingDealer>, WorkflowError> {
        let scope = policy::pending_dealer_scope(caller)?;
        let profiles = self.store.list_pending_dealer_profiles(scope).await?;

        let mut pending = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let dealer = self
                .store
                .find_account(profile.account_id)
                .await?
                .map(|a| DealerContact {
                    name: a.name,
                    email: a.email,
                    phone: a.phone,
                });
            let company_name = match profile.company_id {
                Some(company_id) => self.store.find_company(company_id).await?.map(|c| c.name),
                None => None,
            };
            pending.push(PendingDealer {
                profile,
                dealer,
                company_name,
            });
        }

        Ok(pending)
    }

    /// Approve or reject a dealer profile
    #[instrument(skip(self, request), fields(approver = %caller.account_id, action = ?request.action))]
    pub async fn approve_dealer(
        &self,
        caller: &AuthenticatedAccount,
        profile_id: Uuid,
        request: ReviewRequest,
    ) -> Result<DealerProfile, WorkflowError> {
        let mut profile = self
            .store
            .find_dealer_profile(profile_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Dealer profile".to_string()))?;

        policy::review_dealer(caller, profile.company_id)?;

        let reason = request.reason();
        profile.approval_status = request.action.outcome();
        profile.approved_by = Some(caller.account_id);
        profile.approved_at = Some(Utc::now());
        profile.updated_at = Utc::now();
        profile.rejection_reason = match request.action {
            ReviewAction::Approve => String::new(),
            ReviewAction::Reject => reason.clone().unwrap_or_default(),
        };

        let needs_seat = request.action == ReviewAction::Approve
            && profile.company_id.is_some()
            && !profile.seat_held;

        let profile = if needs_seat {
            match self.store.save_dealer_profile_claiming_seat(&profile).await? {
                SeatClaim::Claimed(profile) => profile,
                SeatClaim::LimitReached => {
                    warn!(%profile_id, "Dealer approval blocked by seat limit");
                    return Err(WorkflowError::SeatLimitReached);
                },
            }
        } else {
            self.store.save_dealer_profile(&profile).await?
        };

        info!(%profile_id, status = %profile.approval_status, "Dealer profile reviewed");

        self.notifier
            .notify(DomainEvent::DealerReviewed {
                dealer_account_id: profile.account_id,
                outcome: profile.approval_status,
                reason,
            })
            .await;

        Ok(profile)
    }
}
