// PostgreSQL implementation of the marketplace store
// Diesel-async over a bb8 pool; multi-row operations run in transactions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use uuid::Uuid;

use super::diesel_pool::{check_diesel_health, DieselConnection, DieselPool};
use super::store::{Found, JoinOutcome, MarketplaceStore, SeatClaim, StoreError};
use crate::models::{
    Account, Company, CompanyStatus, DealerProfile, JoinRequest, Plan, PlanHistoryEntry,
    PlanLimitations, Role,
};

#[derive(Clone)]
pub struct PgStore {
    pool: DieselPool,
}

impl PgStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DieselPool {
        &self.pool
    }

    async fn conn(&self) -> Result<DieselConnection<'_>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn create_account(&self, account: &Account) -> Result<Account, StoreError> {
        let mut conn = self.conn().await?;
        Account::create(&mut conn, account).await
    }

    async fn save_account(&self, account: &Account) -> Result<Account, StoreError> {
        let mut conn = self.conn().await?;
        Account::save(&mut conn, account).await
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut conn = self.conn().await?;
        Account::find_by_id(&mut conn, id).await.found()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let mut conn = self.conn().await?;
        Account::find_by_email(&mut conn, email).await.found()
    }

    async fn delete_account(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        Account::delete(&mut conn, id).await
    }

    async fn list_accounts_by_role(&self, role: Role) -> Result<Vec<Account>, StoreError> {
        let mut conn = self.conn().await?;
        Account::list_by_role(&mut conn, role).await
    }

    async fn create_dealer_profile(
        &self,
        profile: &DealerProfile,
    ) -> Result<DealerProfile, StoreError> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|tx| {
            Box::pin(async move {
                let created = DealerProfile::create(tx, profile).await?;
                Account::mark_profile_completed(tx, profile.account_id).await?;
                Ok(created)
            })
        })
        .await
    }

    async fn save_dealer_profile(
        &self,
        profile: &DealerProfile,
    ) -> Result<DealerProfile, StoreError> {
        let mut conn = self.conn().await?;
        DealerProfile::save(&mut conn, profile).await
    }

    async fn save_dealer_profile_claiming_seat(
        &self,
        profile: &DealerProfile,
    ) -> Result<SeatClaim<DealerProfile>, StoreError> {
        let company_id = profile.company_id.ok_or(StoreError::NotFound)?;
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|tx| {
            Box::pin(async move {
                if !Company::claim_dealer_seat(tx, company_id).await? {
                    return Ok(SeatClaim::LimitReached);
                }

                let mut seated = profile.clone();
                seated.seat_held = true;
                let saved = DealerProfile::save(tx, &seated).await?;
                Ok(SeatClaim::Claimed(saved))
            })
        })
        .await
    }

    async fn find_dealer_profile(&self, id: Uuid) -> Result<Option<DealerProfile>, StoreError> {
        let mut conn = self.conn().await?;
        DealerProfile::find_by_id(&mut conn, id).await.found()
    }

    async fn find_dealer_profile_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<DealerProfile>, StoreError> {
        let mut conn = self.conn().await?;
        DealerProfile::find_by_account(&mut conn, account_id)
            .await
            .found()
    }

    async fn list_pending_dealer_profiles(
        &self,
        company_id: Option<Uuid>,
    ) -> Result<Vec<DealerProfile>, StoreError> {
        let mut conn = self.conn().await?;
        DealerProfile::list_pending(&mut conn, company_id).await
    }

    async fn create_company_with_owner(
        &self,
        company: &Company,
        owner: &Account,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|tx| {
            Box::pin(async move {
                // The owner row exists before the company references it
                let mut unlinked = owner.clone();
                unlinked.company_id = None;
                Account::create(tx, &unlinked).await?;
                Company::create(tx, company).await?;
                Account::set_company(tx, owner.id, Some(company.id)).await?;
                Ok(())
            })
        })
        .await
    }

    async fn delete_company_with_owner(
        &self,
        company_id: Uuid,
        owner_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|tx| {
            Box::pin(async move {
                Company::delete(tx, company_id).await?;
                Account::delete(tx, owner_id).await?;
                Ok(())
            })
        })
        .await
    }

    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError> {
        let mut conn = self.conn().await?;
        Company::find_by_id(&mut conn, id).await.found()
    }

    async fn find_company_by_email(&self, email: &str) -> Result<Option<Company>, StoreError> {
        let mut conn = self.conn().await?;
        Company::find_by_email(&mut conn, email).await.found()
    }

    async fn list_companies(
        &self,
        status: CompanyStatus,
        search: Option<&str>,
    ) -> Result<Vec<Company>, StoreError> {
        let mut conn = self.conn().await?;
        Company::list_by_status(&mut conn, status, search).await
    }

    async fn update_company_status(
        &self,
        id: Uuid,
        status: CompanyStatus,
        reason: Option<String>,
    ) -> Result<Company, StoreError> {
        let mut conn = self.conn().await?;
        Company::update_status(&mut conn, id, status, reason).await
    }

    async fn create_join_request(&self, request: &JoinRequest) -> Result<JoinRequest, StoreError> {
        let mut conn = self.conn().await?;
        JoinRequest::create(&mut conn, request).await
    }

    async fn find_join_request(&self, id: Uuid) -> Result<Option<JoinRequest>, StoreError> {
        let mut conn = self.conn().await?;
        JoinRequest::find_by_id(&mut conn, id).await.found()
    }

    async fn find_pending_join_request(
        &self,
        dealer_profile_id: Uuid,
    ) -> Result<Option<JoinRequest>, StoreError> {
        let mut conn = self.conn().await?;
        JoinRequest::find_pending_for_dealer(&mut conn, dealer_profile_id)
            .await
            .found()
    }

    async fn latest_join_request(
        &self,
        dealer_profile_id: Uuid,
    ) -> Result<Option<JoinRequest>, StoreError> {
        let mut conn = self.conn().await?;
        JoinRequest::latest_for_dealer(&mut conn, dealer_profile_id)
            .await
            .found()
    }

    async fn list_pending_join_requests(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<JoinRequest>, StoreError> {
        let mut conn = self.conn().await?;
        JoinRequest::list_pending_for_company(&mut conn, company_id).await
    }

    async fn save_join_request(&self, request: &JoinRequest) -> Result<JoinRequest, StoreError> {
        let mut conn = self.conn().await?;
        JoinRequest::save(&mut conn, request).await
    }

    async fn accept_join_request(&self, request: &JoinRequest) -> Result<JoinOutcome, StoreError> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|tx| {
            Box::pin(async move {
                // Row lock keeps a parallel affiliation from slipping in
                let mut profile =
                    DealerProfile::find_for_update(tx, request.dealer_profile_id).await?;
                if profile.company_id.is_some() {
                    return Ok(JoinOutcome::AlreadyAffiliated);
                }

                if !Company::claim_dealer_seat(tx, request.company_id).await? {
                    return Ok(JoinOutcome::LimitReached);
                }

                profile.company_id = Some(request.company_id);
                profile.seat_held = true;
                profile.updated_at = Utc::now();
                DealerProfile::save(tx, &profile).await?;
                Account::set_company(tx, profile.account_id, Some(request.company_id)).await?;

                let saved = JoinRequest::save(tx, request).await?;
                Ok(JoinOutcome::Joined(saved))
            })
        })
        .await
    }

    async fn create_plan(&self, plan: &Plan) -> Result<Plan, StoreError> {
        let mut conn = self.conn().await?;
        Plan::create(&mut conn, plan).await
    }

    async fn find_plan(&self, id: Uuid) -> Result<Option<Plan>, StoreError> {
        let mut conn = self.conn().await?;
        Plan::find_by_id(&mut conn, id).await.found()
    }

    async fn list_active_plans(&self) -> Result<Vec<Plan>, StoreError> {
        let mut conn = self.conn().await?;
        Plan::list_active(&mut conn).await
    }

    async fn record_plan_change(
        &self,
        company_id: Uuid,
        limits: &PlanLimitations,
        entry: &PlanHistoryEntry,
        at: DateTime<Utc>,
    ) -> Result<Company, StoreError> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|tx| {
            Box::pin(async move {
                let expired = PlanHistoryEntry::expire_active(tx, company_id, at).await?;
                tracing::debug!(
                    "Expired {} active plan entries for company {}",
                    expired,
                    company_id
                );
                let company = Company::apply_plan(tx, company_id, entry.plan_id, limits).await?;
                PlanHistoryEntry::create(tx, entry).await?;
                Ok(company)
            })
        })
        .await
    }

    async fn list_plan_history(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<PlanHistoryEntry>, StoreError> {
        let mut conn = self.conn().await?;
        PlanHistoryEntry::list_for_company(&mut conn, company_id).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        check_diesel_health(&self.pool).await
    }
}
