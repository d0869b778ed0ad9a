// Marketplace storage seam
// Every workflow component talks to persistence through this trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Account, Company, CompanyStatus, DealerProfile, JoinRequest, Plan, PlanHistoryEntry,
    PlanLimitations, Role,
};

/// Errors raised by storage backends
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection pool error: {0}")]
    Pool(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match e {
            Error::NotFound => StoreError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => StoreError::Conflict(
                info.constraint_name()
                    .unwrap_or("unique constraint")
                    .to_string(),
            ),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Lift `NotFound` into `Ok(None)`
pub trait Found<T> {
    fn found(self) -> Result<Option<T>, StoreError>;
}

impl<T> Found<T> for Result<T, StoreError> {
    fn found(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Outcome of an operation that must take a dealer seat from a company
#[derive(Debug, Clone)]
pub enum SeatClaim<T> {
    /// Seat taken and the change persisted
    Claimed(T),
    /// The company is at its dealer ceiling; nothing was written
    LimitReached,
}

/// Outcome of approving a join request
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// Seat taken, dealer attached and request closed
    Joined(JoinRequest),
    /// The company is at its dealer ceiling; nothing was written
    LimitReached,
    /// The dealer already belongs to a company; nothing was written
    AlreadyAffiliated,
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    // Accounts
    async fn create_account(&self, account: &Account) -> Result<Account, StoreError>;
    async fn save_account(&self, account: &Account) -> Result<Account, StoreError>;
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn delete_account(&self, id: Uuid) -> Result<(), StoreError>;
    /// Verified accounts holding `role`
    async fn list_accounts_by_role(&self, role: Role) -> Result<Vec<Account>, StoreError>;

    // Dealer profiles
    /// Insert the profile and flag the owning account as having one, atomically
    async fn create_dealer_profile(
        &self,
        profile: &DealerProfile,
    ) -> Result<DealerProfile, StoreError>;
    async fn save_dealer_profile(
        &self,
        profile: &DealerProfile,
    ) -> Result<DealerProfile, StoreError>;
    /// Save a reviewed profile while taking a seat in its company
    async fn save_dealer_profile_claiming_seat(
        &self,
        profile: &DealerProfile,
    ) -> Result<SeatClaim<DealerProfile>, StoreError>;
    async fn find_dealer_profile(&self, id: Uuid) -> Result<Option<DealerProfile>, StoreError>;
    async fn find_dealer_profile_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<DealerProfile>, StoreError>;
    /// Pending profiles; `None` means every company and independent dealers
    async fn list_pending_dealer_profiles(
        &self,
        company_id: Option<Uuid>,
    ) -> Result<Vec<DealerProfile>, StoreError>;

    // Companies
    async fn create_company_with_owner(
        &self,
        company: &Company,
        owner: &Account,
    ) -> Result<(), StoreError>;
    async fn delete_company_with_owner(
        &self,
        company_id: Uuid,
        owner_id: Uuid,
    ) -> Result<(), StoreError>;
    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError>;
    async fn find_company_by_email(&self, email: &str) -> Result<Option<Company>, StoreError>;
    async fn list_companies(
        &self,
        status: CompanyStatus,
        search: Option<&str>,
    ) -> Result<Vec<Company>, StoreError>;
    async fn update_company_status(
        &self,
        id: Uuid,
        status: CompanyStatus,
        reason: Option<String>,
    ) -> Result<Company, StoreError>;

    // Join requests
    /// Fails with `Conflict` if the dealer already has a pending request
    async fn create_join_request(&self, request: &JoinRequest) -> Result<JoinRequest, StoreError>;
    async fn find_join_request(&self, id: Uuid) -> Result<Option<JoinRequest>, StoreError>;
    async fn find_pending_join_request(
        &self,
        dealer_profile_id: Uuid,
    ) -> Result<Option<JoinRequest>, StoreError>;
    async fn latest_join_request(
        &self,
        dealer_profile_id: Uuid,
    ) -> Result<Option<JoinRequest>, StoreError>;
    async fn list_pending_join_requests(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<JoinRequest>, StoreError>;
    async fn save_join_request(&self, request: &JoinRequest) -> Result<JoinRequest, StoreError>;
    /// Approve `request`: take a seat, attach the still independent dealer's
    /// profile and account to the company and close the request, all or nothing
    async fn accept_join_request(&self, request: &JoinRequest) -> Result<JoinOutcome, StoreError>;

    // Plans
    async fn create_plan(&self, plan: &Plan) -> Result<Plan, StoreError>;
    async fn find_plan(&self, id: Uuid) -> Result<Option<Plan>, StoreError>;
    async fn list_active_plans(&self) -> Result<Vec<Plan>, StoreError>;
    /// Expire active history entries at `at`, snapshot `limits` onto the
    /// company and append `entry`, in one transaction
    async fn record_plan_change(
        &self,
        company_id: Uuid,
        limits: &PlanLimitations,
        entry: &PlanHistoryEntry,
        at: DateTime<Utc>,
    ) -> Result<Company, StoreError>;
    async fn list_plan_history(&self, company_id: Uuid)
        -> Result<Vec<PlanHistoryEntry>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_lifts_not_found() {
        let missing: Result<u8, StoreError> = Err(StoreError::NotFound);
        assert!(matches!(missing.found(), Ok(None)));

        let present: Result<u8, StoreError> = Ok(7);
        assert!(matches!(present.found(), Ok(Some(7))));

        let broken: Result<u8, StoreError> = Err(StoreError::Database("down".to_string()));
        assert!(broken.found().is_err());
    }

    #[test]
    fn test_diesel_not_found_maps() {
        let e: StoreError = diesel::result::Error::NotFound.into();
        assert!(matches!(e, StoreError::NotFound));
    }
}
