// Workflow notifications
// State transitions emit a `DomainEvent`; delivering it never fails the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::{MarketplaceStore, StoreError},
    models::{Account, ApprovalStatus, CompanyStatus, Role},
    services::email::EmailService,
};

/// Something happened that someone should hear about
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    DealerProfileSubmitted {
        dealer_account_id: Uuid,
        company_id: Option<Uuid>,
        business_name: String,
        resubmission: bool,
    },
    DealerReviewed {
        dealer_account_id: Uuid,
        outcome: ApprovalStatus,
        reason: Option<String>,
    },
    JoinRequested {
        company_id: Uuid,
        dealer_account_id: Uuid,
        business_name: String,
    },
    JoinRequestResolved {
        dealer_account_id: Uuid,
        company_name: String,
        outcome: ApprovalStatus,
        reason: Option<String>,
    },
    CompanyOwnerVerified {
        company_id: Uuid,
    },
    CompanyStatusChanged {
        company_id: Uuid,
        status: CompanyStatus,
        reason: Option<String>,
    },
    PlanAssigned {
        company_id: Uuid,
        plan_name: String,
        end_date: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::DealerProfileSubmitted { .. } => "dealer_profile_submitted",
            DomainEvent::DealerReviewed { .. } => "dealer_reviewed",
            DomainEvent::JoinRequested { .. } => "join_requested",
            DomainEvent::JoinRequestResolved { .. } => "join_request_resolved",
            DomainEvent::CompanyOwnerVerified { .. } => "company_owner_verified",
            DomainEvent::CompanyStatusChanged { .. } => "company_status_changed",
            DomainEvent::PlanAssigned { .. } => "plan_assigned",
        }
    }
}

/// Receives domain events. Implementations swallow and log their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: DomainEvent);
}

/// One rendered notification for one account
struct Notice {
    recipient: Account,
    subject: String,
    headline: String,
    lines: Vec<String>,
}

/// Delivers events as emails to the accounts they concern
#[derive(Clone)]
pub struct EmailNotifier {
    store: Arc<dyn MarketplaceStore>,
    email: EmailService,
}

impl EmailNotifier {
    pub fn new(store: Arc<dyn MarketplaceStore>, email: EmailService) -> Self {
        Self { store, email }
    }

    async fn super_admins(&self) -> Result<Vec<Account>, StoreError> {
        self.store.list_accounts_by_role(Role::SuperAdmin).await
    }

    async fn account(&self, id: Uuid) -> Result<Vec<Account>, StoreError> {
        Ok(self.store.find_account(id).await?.into_iter().collect())
    }

    async fn company_owner(&self, company_id: Uuid) -> Result<Vec<Account>, StoreError> {
        match self.store.find_company(company_id).await? {
            Some(company) => self.account(company.admin_id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn company_name(&self, company_id: Uuid) -> Result<String, StoreError> {
        Ok(self
            .store
            .find_company(company_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_default())
    }

    /// Work out who hears about `event` and what they are told
    async fn notices(&self, event: &DomainEvent) -> Result<Vec<Notice>, StoreError> {
        let (recipients, subject, headline, lines) = match event {
            DomainEvent::DealerProfileSubmitted {
                company_id,
                business_name,
                resubmission,
                ..
            } => {
                let recipients = match company_id {
                    Some(company_id) => self.company_owner(*company_id).await?,
                    None => self.super_admins().await?,
                };
                let verb = if *resubmission { "updated" } else { "submitted" };
                (
                    recipients,
                    "Dealer profile awaiting review".to_string(),
                    format!("{} {} a dealer profile", business_name, verb),
                    vec!["Review it from the pending dealers queue.".to_string()],
                )
            },
            DomainEvent::DealerReviewed {
                dealer_account_id,
                outcome,
                reason,
            } => (
                self.account(*dealer_account_id).await?,
                "Your dealer profile was reviewed".to_string(),
                format!("Your dealer profile has been {}", outcome.as_str()),
                reason
                    .iter()
                    .filter(|r| !r.is_empty())
                    .map(|r| format!("Reason: {}", r))
                    .collect(),
            ),
            DomainEvent::JoinRequested {
                company_id,
                business_name,
                ..
            } => (
                self.company_owner(*company_id).await?,
                "New dealer join request".to_string(),
                format!("{} asked to join your company", business_name),
                vec!["Accept or reject it from your company dashboard.".to_string()],
            ),
            DomainEvent::JoinRequestResolved {
                dealer_account_id,
                company_name,
                outcome,
                reason,
            } => {
                let mut lines = Vec::new();
                if let Some(reason) = reason.as_ref().filter(|r| !r.is_empty()) {
                    lines.push(format!("Reason: {}", reason));
                }
                (
                    self.account(*dealer_account_id).await?,
                    "Your company join request was answered".to_string(),
                    format!(
                        "Your request to join {} has been {}",
                        company_name,
                        outcome.as_str()
                    ),
                    lines,
                )
            },
            DomainEvent::CompanyOwnerVerified { company_id } => {
                let name = self.company_name(*company_id).await?;
                (
                    self.super_admins().await?,
                    "Company awaiting approval".to_string(),
                    format!("{} verified its owner and awaits approval", name),
                    vec!["Review it from the pending companies queue.".to_string()],
                )
            },
            DomainEvent::CompanyStatusChanged {
                company_id,
                status,
                reason,
            } => {
                let name = self.company_name(*company_id).await?;
                let mut lines = Vec::new();
                if let Some(reason) = reason.as_ref().filter(|r| !r.is_empty()) {
                    lines.push(format!("Reason: {}", reason));
                }
                (
                    self.company_owner(*company_id).await?,
                    "Company status updated".to_string(),
                    format!("{} is now {}", name, status.as_str()),
                    lines,
                )
            },
            DomainEvent::PlanAssigned {
                company_id,
                plan_name,
                end_date,
            } => (
                self.company_owner(*company_id).await?,
                "Subscription plan updated".to_string(),
                format!("Your company is now on the {} plan", plan_name),
                vec![format!("Valid until {}", end_date.format("%Y-%m-%d"))],
            ),
        };

        Ok(recipients
            .into_iter()
            .map(|recipient| Notice {
                recipient,
                subject: subject.clone(),
                headline: headline.clone(),
                lines: lines.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    #[instrument(skip(self, event), fields(event = event.name()))]
    async fn notify(&self, event: DomainEvent) {
        let notices = match self.notices(&event).await {
            Ok(notices) => notices,
            Err(e) => {
                error!("Could not resolve notification recipients: {}", e);
                return;
            },
        };

        if notices.is_empty() {
            warn!("No recipients for notification");
            return;
        }

        for notice in notices {
            match self
                .email
                .send_notification(
                    &notice.recipient.email,
                    &notice.recipient.name,
                    &notice.subject,
                    &notice.headline,
                    &notice.lines,
                )
                .await
            {
                Ok(()) => info!("Notification sent to {}", notice.recipient.email),
                Err(e) => error!(
                    "Notification to {} failed: {}",
                    notice.recipient.email, e
                ),
            }
        }
    }
}
