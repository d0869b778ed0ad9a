// In-process marketplace store
// Backs tests and local runs with STORE_BACKEND=memory. One lock guards every
// table, so each trait method is atomic the same way a transaction is.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::store::{JoinOutcome, MarketplaceStore, SeatClaim, StoreError};
use crate::models::{
    Account, ApprovalStatus, Company, CompanyStatus, DealerProfile, JoinRequest, Plan,
    PlanHistoryEntry, PlanHistoryStatus, PlanLimitations, Role, SubscriptionStatus,
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    dealer_profiles: HashMap<Uuid, DealerProfile>,
    companies: HashMap<Uuid, Company>,
    join_requests: HashMap<Uuid, JoinRequest>,
    plans: HashMap<Uuid, Plan>,
    plan_history: Vec<PlanHistoryEntry>,
}

impl Tables {
    fn account_email_taken(&self, email: &str, except: Uuid) -> bool {
        self.accounts
            .values()
            .any(|a| a.id != except && a.email == email)
    }

    fn claim_seat(&mut self, company_id: Uuid) -> Result<bool, StoreError> {
        let company = self
            .companies
            .get_mut(&company_id)
            .ok_or(StoreError::NotFound)?;

        if company.total_dealers >= company.max_dealers {
            return Ok(false);
        }

        company.total_dealers += 1;
        company.updated_at = Utc::now();
        Ok(true)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }

    /// Number of stored accounts
    pub fn account_count(&self) -> usize {
        self.lock().map(|t| t.accounts.len()).unwrap_or(0)
    }

    /// Number of stored companies
    pub fn company_count(&self) -> usize {
        self.lock().map(|t| t.companies.len()).unwrap_or(0)
    }

    /// Overwrite a company's usage counters. Property counts have no workflow
    /// of their own in this service, so fixtures set them directly.
    pub fn set_company_usage(
        &self,
        company_id: Uuid,
        total_dealers: i32,
        total_properties: i32,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let company = tables
            .companies
            .get_mut(&company_id)
            .ok_or(StoreError::NotFound)?;
        company.total_dealers = total_dealers;
        company.total_properties = total_properties;
        Ok(())
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn create_account(&self, account: &Account) -> Result<Account, StoreError> {
        let mut tables = self.lock()?;
        if tables.account_email_taken(&account.email, account.id) {
            return Err(StoreError::Conflict("accounts_email_lower_idx".to_string()));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn save_account(&self, account: &Account) -> Result<Account, StoreError> {
        let mut tables = self.lock()?;
        if !tables.accounts.contains_key(&account.id) {
            return Err(StoreError::NotFound);
        }
        if tables.account_email_taken(&account.email, account.id) {
            return Err(StoreError::Conflict("accounts_email_lower_idx".to_string()));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn delete_account(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.accounts.remove(&id);

        // ON DELETE CASCADE for the owned profile and its requests
        let owned: Vec<Uuid> = tables
            .dealer_profiles
            .values()
            .filter(|p| p.account_id == id)
            .map(|p| p.id)
            .collect();
        for profile_id in owned {
            tables.dealer_profiles.remove(&profile_id);
            tables
                .join_requests
                .retain(|_, r| r.dealer_profile_id != profile_id);
        }
        Ok(())
    }

    async fn list_accounts_by_role(&self, role: Role) -> Result<Vec<Account>, StoreError> {
        let mut found: Vec<Account> = self
            .lock()?
            .accounts
            .values()
            .filter(|a| a.role == role && a.verified)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn create_dealer_profile(
        &self,
        profile: &DealerProfile,
    ) -> Result<DealerProfile, StoreError> {
        let mut tables = self.lock()?;
        if tables
            .dealer_profiles
            .values()
            .any(|p| p.account_id == profile.account_id)
        {
            return Err(StoreError::Conflict(
                "dealer_profiles_account_id_key".to_string(),
            ));
        }

        let account = tables
            .accounts
            .get_mut(&profile.account_id)
            .ok_or(StoreError::NotFound)?;
        account.dealer_profile_completed = true;
        account.updated_at = Utc::now();

        tables.dealer_profiles.insert(profile.id, profile.clone());
        Ok(profile.clone())
    }

    async fn save_dealer_profile(
        &self,
        profile: &DealerProfile,
    ) -> Result<DealerProfile, StoreError> {
        let mut tables = self.lock()?;
        if !tables.dealer_profiles.contains_key(&profile.id) {
            return Err(StoreError::NotFound);
        }
        tables.dealer_profiles.insert(profile.id, profile.clone());
        Ok(profile.clone())
    }

    async fn save_dealer_profile_claiming_seat(
        &self,
        profile: &DealerProfile,
    ) -> Result<SeatClaim<DealerProfile>, StoreError> {
        let company_id = profile.company_id.ok_or(StoreError::NotFound)?;
        let mut tables = self.lock()?;
        if !tables.dealer_profiles.contains_key(&profile.id) {
            return Err(StoreError::NotFound);
        }

        if !tables.claim_seat(company_id)? {
            return Ok(SeatClaim::LimitReached);
        }

        let mut seated = profile.clone();
        seated.seat_held = true;
        tables.dealer_profiles.insert(seated.id, seated.clone());
        Ok(SeatClaim::Claimed(seated))
    }

    async fn find_dealer_profile(&self, id: Uuid) -> Result<Option<DealerProfile>, StoreError> {
        Ok(self.lock()?.dealer_profiles.get(&id).cloned())
    }

    async fn find_dealer_profile_by_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<DealerProfile>, StoreError> {
        Ok(self
            .lock()?
            .dealer_profiles
            .values()
            .find(|p| p.account_id == account_id)
            .cloned())
    }

    async fn list_pending_dealer_profiles(
        &self,
        company_id: Option<Uuid>,
    ) -> Result<Vec<DealerProfile>, StoreError> {
        let mut found: Vec<DealerProfile> = self
            .lock()?
            .dealer_profiles
            .values()
            .filter(|p| p.approval_status == ApprovalStatus::Pending)
            .filter(|p| company_id.is_none() || p.company_id == company_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.updated_at);
        Ok(found)
    }

    async fn create_company_with_owner(
        &self,
        company: &Company,
        owner: &Account,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.account_email_taken(&owner.email, owner.id) {
            return Err(StoreError::Conflict("accounts_email_lower_idx".to_string()));
        }
        if tables.companies.values().any(|c| c.email == company.email) {
            return Err(StoreError::Conflict("companies_email_lower_idx".to_string()));
        }

        let mut linked = owner.clone();
        linked.company_id = Some(company.id);
        tables.accounts.insert(linked.id, linked);
        tables.companies.insert(company.id, company.clone());
        Ok(())
    }

    async fn delete_company_with_owner(
        &self,
        company_id: Uuid,
        owner_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.companies.remove(&company_id);
        tables.accounts.remove(&owner_id);
        tables.join_requests.retain(|_, r| r.company_id != company_id);
        tables.plan_history.retain(|e| e.company_id != company_id);

        // ON DELETE SET NULL
        for profile in tables.dealer_profiles.values_mut() {
            if profile.company_id == Some(company_id) {
                profile.company_id = None;
                profile.seat_held = false;
            }
        }
        for account in tables.accounts.values_mut() {
            if account.company_id == Some(company_id) {
                account.company_id = None;
            }
        }
        Ok(())
    }

    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError> {
        Ok(self.lock()?.companies.get(&id).cloned())
    }

    async fn find_company_by_email(&self, email: &str) -> Result<Option<Company>, StoreError> {
        Ok(self
            .lock()?
            .companies
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn list_companies(
        &self,
        status: CompanyStatus,
        search: Option<&str>,
    ) -> Result<Vec<Company>, StoreError> {
        let needle = search.map(|s| s.to_lowercase());
        let mut found: Vec<Company> = self
            .lock()?
            .companies
            .values()
            .filter(|c| c.status == status)
            .filter(|c| match &needle {
                Some(term) => {
                    c.name.to_lowercase().contains(term) || c.city.to_lowercase().contains(term)
                },
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn update_company_status(
        &self,
        id: Uuid,
        status: CompanyStatus,
        reason: Option<String>,
    ) -> Result<Company, StoreError> {
        let mut tables = self.lock()?;
        let company = tables.companies.get_mut(&id).ok_or(StoreError::NotFound)?;
        company.status = status;
        company.status_reason = reason;
        company.updated_at = Utc::now();
        Ok(company.clone())
    }

    async fn create_join_request(&self, request: &JoinRequest) -> Result<JoinRequest, StoreError> {
        let mut tables = self.lock()?;
        if tables
            .join_requests
            .values()
            .any(|r| r.dealer_profile_id == request.dealer_profile_id && r.is_pending())
        {
            return Err(StoreError::Conflict(
                "company_join_requests_one_pending_idx".to_string(),
            ));
        }
        tables.join_requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_join_request(&self, id: Uuid) -> Result<Option<JoinRequest>, StoreError> {
        Ok(self.lock()?.join_requests.get(&id).cloned())
    }

    async fn find_pending_join_request(
        &self,
        dealer_profile_id: Uuid,
    ) -> Result<Option<JoinRequest>, StoreError> {
        Ok(self
            .lock()?
            .join_requests
            .values()
            .find(|r| r.dealer_profile_id == dealer_profile_id && r.is_pending())
            .cloned())
    }

    async fn latest_join_request(
        &self,
        dealer_profile_id: Uuid,
    ) -> Result<Option<JoinRequest>, StoreError> {
        Ok(self
            .lock()?
            .join_requests
            .values()
            .filter(|r| r.dealer_profile_id == dealer_profile_id)
            .max_by_key(|r| r.requested_at)
            .cloned())
    }

    async fn list_pending_join_requests(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<JoinRequest>, StoreError> {
        let mut found: Vec<JoinRequest> = self
            .lock()?
            .join_requests
            .values()
            .filter(|r| r.company_id == company_id && r.is_pending())
            .cloned()
            .collect();
        found.sort_by_key(|r| r.requested_at);
        Ok(found)
    }

    async fn save_join_request(&self, request: &JoinRequest) -> Result<JoinRequest, StoreError> {
        let mut tables = self.lock()?;
        if !tables.join_requests.contains_key(&request.id) {
            return Err(StoreError::NotFound);
        }
        tables.join_requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn accept_join_request(&self, request: &JoinRequest) -> Result<JoinOutcome, StoreError> {
        let mut tables = self.lock()?;
        if !tables.join_requests.contains_key(&request.id) {
            return Err(StoreError::NotFound);
        }
        let profile = tables
            .dealer_profiles
            .get(&request.dealer_profile_id)
            .ok_or(StoreError::NotFound)?;
        if profile.company_id.is_some() {
            return Ok(JoinOutcome::AlreadyAffiliated);
        }
        let account_id = profile.account_id;

        if !tables.claim_seat(request.company_id)? {
            return Ok(JoinOutcome::LimitReached);
        }

        let now = Utc::now();
        if let Some(profile) = tables.dealer_profiles.get_mut(&request.dealer_profile_id) {
            profile.company_id = Some(request.company_id);
            profile.seat_held = true;
            profile.updated_at = now;
        }
        if let Some(account) = tables.accounts.get_mut(&account_id) {
            account.company_id = Some(request.company_id);
            account.updated_at = now;
        }
        tables.join_requests.insert(request.id, request.clone());
        Ok(JoinOutcome::Joined(request.clone()))
    }

    async fn create_plan(&self, plan: &Plan) -> Result<Plan, StoreError> {
        self.lock()?.plans.insert(plan.id, plan.clone());
        Ok(plan.clone())
    }

    async fn find_plan(&self, id: Uuid) -> Result<Option<Plan>, StoreError> {
        Ok(self.lock()?.plans.get(&id).cloned())
    }

    async fn list_active_plans(&self) -> Result<Vec<Plan>, StoreError> {
        let mut found: Vec<Plan> = self
            .lock()?
            .plans
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.price);
        Ok(found)
    }

    async fn record_plan_change(
        &self,
        company_id: Uuid,
        limits: &PlanLimitations,
        entry: &PlanHistoryEntry,
        at: DateTime<Utc>,
    ) -> Result<Company, StoreError> {
        let mut tables = self.lock()?;
        if !tables.companies.contains_key(&company_id) {
            return Err(StoreError::NotFound);
        }

        for existing in tables
            .plan_history
            .iter_mut()
            .filter(|e| e.company_id == company_id && e.status == PlanHistoryStatus::Active)
        {
            existing.status = PlanHistoryStatus::Expired;
            existing.end_date = at;
        }
        tables.plan_history.push(entry.clone());

        let company = tables
            .companies
            .get_mut(&company_id)
            .ok_or(StoreError::NotFound)?;
        company.max_dealers = limits.max_dealers;
        company.max_properties = limits.max_properties;
        company.plan_features = limits.features.clone();
        company.current_plan_id = Some(entry.plan_id);
        company.subscription_status = SubscriptionStatus::Active;
        company.updated_at = at;
        Ok(company.clone())
    }

    async fn list_plan_history(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<PlanHistoryEntry>, StoreError> {
        Ok(self
            .lock()?
            .plan_history
            .iter()
            .filter(|e| e.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::company::NewCompany;

    fn owner(email: &str) -> Account {
        Account::new_unverified(
            "Owner".to_string(),
            email.to_string(),
            "+1".to_string(),
            "hash".to_string(),
            Role::CompanyAdmin,
            None,
            "123456".to_string(),
            Utc::now(),
        )
    }

    fn company(admin_id: Uuid, email: &str, max_dealers: i32) -> Company {
        Company::new(
            NewCompany {
                name: "Acme".to_string(),
                email: email.to_string(),
                phone: String::new(),
                license_number: "L-1".to_string(),
                address: String::new(),
                city: "Pune".to_string(),
                website: None,
                description: String::new(),
            },
            admin_id,
            PlanLimitations {
                max_dealers,
                max_properties: 5,
                features: vec![],
            },
        )
    }

    #[tokio::test]
    async fn test_duplicate_account_email_conflicts() {
        let store = MemoryStore::new();
        store.create_account(&owner("a@x.com")).await.unwrap();

        let result = store.create_account(&owner("a@x.com")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn test_company_with_owner_round_trip() {
        let store = MemoryStore::new();
        let admin = owner("boss@acme.test");
        let acme = company(admin.id, "office@acme.test", 1);

        store.create_company_with_owner(&acme, &admin).await.unwrap();
        let stored_owner = store.find_account(admin.id).await.unwrap().unwrap();
        assert_eq!(stored_owner.company_id, Some(acme.id));

        store
            .delete_company_with_owner(acme.id, admin.id)
            .await
            .unwrap();
        assert!(store.find_company(acme.id).await.unwrap().is_none());
        assert!(store.find_account(admin.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seat_claim_stops_at_limit() {
        let store = MemoryStore::new();
        let admin = owner("boss@acme.test");
        let acme = company(admin.id, "office@acme.test", 1);
        store.create_company_with_owner(&acme, &admin).await.unwrap();

        let mut tables = store.lock().unwrap();
        assert!(tables.claim_seat(acme.id).unwrap());
        assert!(!tables.claim_seat(acme.id).unwrap());
        assert_eq!(tables.companies[&acme.id].total_dealers, 1);
    }

    #[tokio::test]
    async fn test_one_pending_join_request_per_dealer() {
        let store = MemoryStore::new();
        let profile_id = Uuid::new_v4();

        store
            .create_join_request(&JoinRequest::new(profile_id, Uuid::new_v4()))
            .await
            .unwrap();
        let second = store
            .create_join_request(&JoinRequest::new(profile_id, Uuid::new_v4()))
            .await;

        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_join_approval_never_replaces_existing_affiliation() {
        let store = MemoryStore::new();
        let admin_a = owner("boss@a.test");
        let company_a = company(admin_a.id, "office@a.test", 2);
        store.create_company_with_owner(&company_a, &admin_a).await.unwrap();
        let admin_b = owner("boss@b.test");
        let company_b = company(admin_b.id, "office@b.test", 2);
        store.create_company_with_owner(&company_b, &admin_b).await.unwrap();

        let dealer = store.create_account(&owner("dealer@x.test")).await.unwrap();
        let mut profile = store
            .create_dealer_profile(&DealerProfile::new(dealer.id, None, Default::default()))
            .await
            .unwrap();
        let mut request = store
            .create_join_request(&JoinRequest::new(profile.id, company_a.id))
            .await
            .unwrap();

        // The dealer lands at another company before the request is answered
        profile.company_id = Some(company_b.id);
        store.save_dealer_profile(&profile).await.unwrap();

        request.resolve(ApprovalStatus::Approved, admin_a.id, None);
        let outcome = store.accept_join_request(&request).await.unwrap();
        assert!(matches!(outcome, JoinOutcome::AlreadyAffiliated));

        let stored = store.find_dealer_profile(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.company_id, Some(company_b.id));
        let company_a = store.find_company(company_a.id).await.unwrap().unwrap();
        assert_eq!(company_a.total_dealers, 0);
    }
}
