// Plan/subscription ledger
// Companies hold a snapshot of their plan's limits plus an append-only history of plan changes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::MarketplaceStore,
    middleware::AuthenticatedAccount,
    models::{Company, Plan, PlanHistoryEntry, PlanLimitations, SubscriptionStatus},
    services::{
        company::CompanyView,
        notifier::{DomainEvent, Notifier},
        policy,
    },
    utils::WorkflowError,
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100, message = "Plan name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i32,

    #[validate(range(min = 1, max = 3650, message = "Validity must be between 1 and 3650 days"))]
    pub validate_days: i32,

    pub limitations: PlanLimitations,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPlanRequest {
    pub company_id: Uuid,
    pub plan_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest {
    pub plan_id: Uuid,
}

/// What the caller is about to add
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LimitAction {
    AddDealer,
    AddProperty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckLimitsQuery {
    pub action: LimitAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitCheck {
    pub can_proceed: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanChange {
    pub company: CompanyView,
    pub plan_history_entry: PlanHistoryEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: Plan,
    pub limitations: PlanLimitations,
}

impl From<Plan> for PlanView {
    fn from(plan: Plan) -> Self {
        Self {
            limitations: plan.limitations(),
            plan,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOverview {
    pub subscription_status: SubscriptionStatus,
    pub current_plan: Option<PlanView>,
    pub plan_limitations: PlanLimitations,
    pub total_dealers: i32,
    pub total_properties: i32,
    pub can_add_dealer: bool,
    pub can_add_property: bool,
    pub plan_history: Vec<PlanHistoryEntry>,
}

/// Refuse a plan whose ceilings sit below what the company already uses
pub fn ensure_fits(company: &Company, limits: &PlanLimitations) -> Result<(), WorkflowError> {
    if company.total_dealers > limits.max_dealers {
        return Err(WorkflowError::PlanExceedsUsage(format!(
            "company has {} dealers but the plan allows {}",
            company.total_dealers, limits.max_dealers
        )));
    }
    if company.total_properties > limits.max_properties {
        return Err(WorkflowError::PlanExceedsUsage(format!(
            "company has {} properties but the plan allows {}",
            company.total_properties, limits.max_properties
        )));
    }
    Ok(())
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Clone)]
pub struct SubscriptionLedger {
    store: Arc<dyn MarketplaceStore>,
    notifier: Arc<dyn Notifier>,
}

impl SubscriptionLedger {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    async fn company(&self, company_id: Uuid) -> Result<Company, WorkflowError> {
        self.store
            .find_company(company_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Company".to_string()))
    }

    async fn active_plan(&self, plan_id: Uuid) -> Result<Plan, WorkflowError> {
        match self.store.find_plan(plan_id).await? {
            Some(plan) if plan.is_active => Ok(plan),
            _ => Err(WorkflowError::NotFound("Plan".to_string())),
        }
    }

    /// Define a new plan
    #[instrument(skip(self, request), fields(plan = %request.name))]
    pub async fn create_plan(
        &self,
        caller: &AuthenticatedAccount,
        request: CreatePlanRequest,
    ) -> Result<PlanView, WorkflowError> {
        policy::create_plans(caller)?;
        request.validate()?;

        if request.limitations.max_dealers < 0 || request.limitations.max_properties < 0 {
            return Err(WorkflowError::Validation(
                "limitations: limits cannot be negative".to_string(),
            ));
        }

        let plan = Plan::new(
            request.name.trim().to_string(),
            request.description,
            request.price,
            request.validate_days,
            request.limitations,
        );
        let plan = self.store.create_plan(&plan).await?;

        info!(plan_id = %plan.id, "Plan created");
        Ok(plan.into())
    }

    /// Plans currently on offer, cheapest first
    pub async fn list_plans(&self) -> Result<Vec<PlanView>, WorkflowError> {
        let plans = self.store.list_active_plans().await?;
        Ok(plans.into_iter().map(PlanView::from).collect())
    }

    async fn switch_plan(
        &self,
        company: &Company,
        plan: &Plan,
        at: DateTime<Utc>,
    ) -> Result<PlanChange, WorkflowError> {
        let entry = plan.history_entry(company.id, at);
        let updated = self
            .store
            .record_plan_change(company.id, &plan.limitations(), &entry, at)
            .await?;

        info!(company_id = %company.id, plan_id = %plan.id, "Plan recorded");

        self.notifier
            .notify(DomainEvent::PlanAssigned {
                company_id: company.id,
                plan_name: plan.name.clone(),
                end_date: entry.end_date,
            })
            .await;

        Ok(PlanChange {
            company: updated.into(),
            plan_history_entry: entry,
        })
    }

    /// Put a company on a plan
    #[instrument(skip(self, request), fields(company_id = %request.company_id, plan_id = %request.plan_id))]
    pub async fn assign_plan(
        &self,
        caller: &AuthenticatedAccount,
        request: AssignPlanRequest,
    ) -> Result<PlanChange, WorkflowError> {
        policy::assign_plans(caller)?;

        let company = self.company(request.company_id).await?;
        let plan = self.active_plan(request.plan_id).await?;

        self.switch_plan(&company, &plan, Utc::now()).await
    }

    /// Self-service plan change; never below current usage
    #[instrument(skip(self, request), fields(account_id = %caller.account_id, plan_id = %request.plan_id))]
    pub async fn change_plan(
        &self,
        caller: &AuthenticatedAccount,
        request: ChangePlanRequest,
    ) -> Result<PlanChange, WorkflowError> {
        let company_id = policy::change_own_plan(caller)?;

        let company = self.company(company_id).await?;
        let plan = self.active_plan(request.plan_id).await?;

        if let Err(e) = ensure_fits(&company, &plan.limitations()) {
            warn!(%company_id, "Plan change refused: {}", e);
            return Err(e);
        }

        self.switch_plan(&company, &plan, Utc::now()).await
    }

    /// Advisory pre-check; the seat claim in the affiliation flow is what enforces it
    pub async fn check_limits(
        &self,
        caller: &AuthenticatedAccount,
        action: LimitAction,
    ) -> Result<LimitCheck, WorkflowError> {
        let company_id = policy::check_own_limits(caller)?;
        let company = self.company(company_id).await?;

        let check = match action {
            LimitAction::AddDealer if company.can_add_dealer() => LimitCheck {
                can_proceed: true,
                message: format!(
                    "{} of {} dealer seats used",
                    company.total_dealers, company.max_dealers
                ),
            },
            LimitAction::AddDealer => LimitCheck {
                can_proceed: false,
                message: format!(
                    "Dealer limit of {} reached. Upgrade your plan to add more dealers",
                    company.max_dealers
                ),
            },
            LimitAction::AddProperty if company.can_add_property() => LimitCheck {
                can_proceed: true,
                message: format!(
                    "{} of {} property listings used",
                    company.total_properties, company.max_properties
                ),
            },
            LimitAction::AddProperty => LimitCheck {
                can_proceed: false,
                message: format!(
                    "Property limit of {} reached. Upgrade your plan to add more properties",
                    company.max_properties
                ),
            },
        };

        Ok(check)
    }

    /// Current limits, status and full plan history of the caller's company
    pub async fn company_subscription(
        &self,
        caller: &AuthenticatedAccount,
    ) -> Result<SubscriptionOverview, WorkflowError> {
        let company_id = policy::check_own_limits(caller)?;
        let company = self.company(company_id).await?;

        let current_plan = match company.current_plan_id {
            Some(plan_id) => self.store.find_plan(plan_id).await?.map(PlanView::from),
            None => None,
        };
        let plan_history = self.store.list_plan_history(company_id).await?;

        Ok(SubscriptionOverview {
            subscription_status: company.subscription_status,
            current_plan,
            plan_limitations: company.plan_limitations(),
            total_dealers: company.total_dealers,
            total_properties: company.total_properties,
            can_add_dealer: company.can_add_dealer(),
            can_add_property: company.can_add_property(),
            plan_history,
        })
    }
}
