// Company Database Model
// Tenant organization owned by a single company_admin account

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::impl_text_sql;
use crate::db::StoreError;
use crate::schema::companies;

/// Platform approval status of a company. Only a super_admin changes it.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Pending => "pending",
            CompanyStatus::Approved => "approved",
            CompanyStatus::Rejected => "rejected",
            CompanyStatus::Suspended => "suspended",
        }
    }

    /// Only approved companies accept new dealers
    pub fn permits_affiliation(&self) -> bool {
        matches!(self, CompanyStatus::Approved)
    }
}

impl FromStr for CompanyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CompanyStatus::Pending),
            "approved" => Ok(CompanyStatus::Approved),
            "rejected" => Ok(CompanyStatus::Rejected),
            "suspended" => Ok(CompanyStatus::Suspended),
            _ => Err(format!("Invalid company status: {}", s)),
        }
    }
}

impl_text_sql!(CompanyStatus);

/// Subscription state, independent of the approval status
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Trial,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "inactive" => Ok(SubscriptionStatus::Inactive),
            "trial" => Ok(SubscriptionStatus::Trial),
            "expired" => Ok(SubscriptionStatus::Expired),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

impl_text_sql!(SubscriptionStatus);

/// Usage ceilings copied from a plan when it is assigned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimitations {
    pub max_dealers: i32,
    pub max_properties: i32,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Company database model
#[derive(
    Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = companies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    #[serde(rename = "companyId")]
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub address: String,
    pub city: String,
    pub website: Option<String>,
    pub description: String,
    pub admin_id: Uuid,
    pub status: CompanyStatus,
    pub status_reason: Option<String>,
    pub subscription_status: SubscriptionStatus,
    #[serde(skip_serializing)]
    pub max_dealers: i32,
    #[serde(skip_serializing)]
    pub max_properties: i32,
    #[serde(skip_serializing)]
    pub plan_features: Vec<String>,
    pub current_plan_id: Option<Uuid>,
    pub total_dealers: i32,
    pub total_properties: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a prospective company submits at registration
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub address: String,
    pub city: String,
    pub website: Option<String>,
    pub description: String,
}

impl Company {
    /// Pending company on trial limits, owned by `admin_id`
    pub fn new(fields: NewCompany, admin_id: Uuid, trial: PlanLimitations) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            id,
            external_id: format!("CMP-{}", &id.simple().to_string()[..12].to_uppercase()),
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            license_number: fields.license_number,
            address: fields.address,
            city: fields.city,
            website: fields.website,
            description: fields.description,
            admin_id,
            status: CompanyStatus::Pending,
            status_reason: None,
            subscription_status: SubscriptionStatus::Trial,
            max_dealers: trial.max_dealers,
            max_properties: trial.max_properties,
            plan_features: trial.features,
            current_plan_id: None,
            total_dealers: 0,
            total_properties: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn plan_limitations(&self) -> PlanLimitations {
        PlanLimitations {
            max_dealers: self.max_dealers,
            max_properties: self.max_properties,
            features: self.plan_features.clone(),
        }
    }

    pub fn can_add_dealer(&self) -> bool {
        self.total_dealers < self.max_dealers
    }

    pub fn can_add_property(&self) -> bool {
        self.total_properties < self.max_properties
    }

    /// Free dealer seats, never negative
    pub fn dealer_slots(&self) -> i32 {
        (self.max_dealers - self.total_dealers).max(0)
    }

    /// Find company by ID
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        company_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::companies::dsl::*;

        companies
            .filter(id.eq(company_id))
            .select(Company::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> Result<Self, StoreError> {
        use crate::schema::companies::dsl::*;

        companies
            .filter(email.eq(email_str))
            .select(Company::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Companies in `wanted` status, optionally narrowed by a name/city search term
    pub async fn list_by_status(
        conn: &mut AsyncPgConnection,
        wanted: CompanyStatus,
        search: Option<&str>,
    ) -> Result<Vec<Self>, StoreError> {
        use crate::schema::companies::dsl::*;
        use diesel::PgTextExpressionMethods;

        let mut query = companies.filter(status.eq(wanted)).into_boxed();

        if let Some(term) = search {
            let pattern = format!("%{}%", escape_like(term));
            query = query.filter(name.ilike(pattern.clone()).or(city.ilike(pattern)));
        }

        query
            .order(name.asc())
            .select(Company::as_select())
            .load(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn create(conn: &mut AsyncPgConnection, company: &Company) -> Result<Self, StoreError> {
        diesel::insert_into(companies::table)
            .values(company)
            .returning(Company::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn delete(conn: &mut AsyncPgConnection, company_id: Uuid) -> Result<(), StoreError> {
        diesel::delete(companies::table.find(company_id))
            .execute(conn)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }

    pub async fn update_status(
        conn: &mut AsyncPgConnection,
        company_id: Uuid,
        new_status: CompanyStatus,
        reason: Option<String>,
    ) -> Result<Self, StoreError> {
        use crate::schema::companies::dsl::*;

        diesel::update(companies.find(company_id))
            .set((
                status.eq(new_status),
                status_reason.eq(reason),
                updated_at.eq(Utc::now()),
            ))
            .returning(Company::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Take one dealer seat if one is free. Returns false when the company is full.
    /// The limit check and the increment are a single conditional UPDATE.
    pub async fn claim_dealer_seat(
        conn: &mut AsyncPgConnection,
        company_id: Uuid,
    ) -> Result<bool, StoreError> {
        use crate::schema::companies::dsl::*;

        let updated = diesel::update(
            companies
                .filter(id.eq(company_id))
                .filter(total_dealers.lt(max_dealers)),
        )
        .set((total_dealers.eq(total_dealers + 1), updated_at.eq(Utc::now())))
        .execute(conn)
        .await
        .map_err(StoreError::from)?;

        Ok(updated == 1)
    }

    pub async fn apply_plan(
        conn: &mut AsyncPgConnection,
        company_id: Uuid,
        plan_id: Uuid,
        limits: &PlanLimitations,
    ) -> Result<Self, StoreError> {
        use crate::schema::companies::dsl::*;

        diesel::update(companies.find(company_id))
            .set((
                max_dealers.eq(limits.max_dealers),
                max_properties.eq(limits.max_properties),
                plan_features.eq(&limits.features),
                current_plan_id.eq(Some(plan_id)),
                subscription_status.eq(SubscriptionStatus::Active),
                updated_at.eq(Utc::now()),
            ))
            .returning(Company::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(max_dealers: i32, total_dealers: i32) -> Company {
        let mut company = Company::new(
            NewCompany {
                name: "Acme Estates".to_string(),
                email: "office@acme.test".to_string(),
                phone: "+1".to_string(),
                license_number: "RERA-1".to_string(),
                address: "1 Main St".to_string(),
                city: "Pune".to_string(),
                website: None,
                description: String::new(),
            },
            Uuid::new_v4(),
            PlanLimitations {
                max_dealers,
                max_properties: 10,
                features: vec![],
            },
        );
        company.total_dealers = total_dealers;
        company
    }

    #[test]
    fn test_company_status_conversion() {
        assert_eq!(CompanyStatus::Suspended.as_str(), "suspended");
        assert_eq!(CompanyStatus::from_str("approved"), Ok(CompanyStatus::Approved));
        assert!(CompanyStatus::from_str("archived").is_err());
        assert!(CompanyStatus::Approved.permits_affiliation());
        assert!(!CompanyStatus::Pending.permits_affiliation());
        assert!(!CompanyStatus::Suspended.permits_affiliation());
    }

    #[test]
    fn test_subscription_status_conversion() {
        assert_eq!(SubscriptionStatus::Trial.as_str(), "trial");
        assert_eq!(
            SubscriptionStatus::from_str("expired"),
            Ok(SubscriptionStatus::Expired)
        );
        assert!(SubscriptionStatus::from_str("paused").is_err());
    }

    #[test]
    fn test_new_company_is_pending_trial() {
        let company = company(2, 0);

        assert_eq!(company.status, CompanyStatus::Pending);
        assert_eq!(company.subscription_status, SubscriptionStatus::Trial);
        assert!(company.external_id.starts_with("CMP-"));
        assert_eq!(company.external_id.len(), 16);
    }

    #[test]
    fn test_derived_capacity() {
        assert!(company(2, 1).can_add_dealer());
        assert!(!company(1, 1).can_add_dealer());
        assert_eq!(company(1, 1).dealer_slots(), 0);
        assert_eq!(company(1, 3).dealer_slots(), 0);
        assert_eq!(company(5, 2).dealer_slots(), 3);
    }

    #[test]
    fn test_like_escaping() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
