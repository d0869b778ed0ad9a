// Subscription Plan and Plan History Models

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::company::PlanLimitations;
use super::impl_text_sql;
use crate::db::StoreError;
use crate::schema::{plan_history, plans};

/// Status of a plan history entry. At most one entry per company is active.
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
pub enum PlanHistoryStatus {
    Active,
    Expired,
    Cancelled,
}

impl PlanHistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanHistoryStatus::Active => "active",
            PlanHistoryStatus::Expired => "expired",
            PlanHistoryStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PlanHistoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PlanHistoryStatus::Active),
            "expired" => Ok(PlanHistoryStatus::Expired),
            "cancelled" => Ok(PlanHistoryStatus::Cancelled),
            _ => Err(format!("Invalid plan history status: {}", s)),
        }
    }
}

impl_text_sql!(PlanHistoryStatus);

/// Plan definition managed by the platform
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub validate_days: i32,
    #[serde(skip_serializing)]
    pub max_dealers: i32,
    #[serde(skip_serializing)]
    pub max_properties: i32,
    #[serde(skip_serializing)]
    pub features: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        name: String,
        description: String,
        price: i32,
        validate_days: i32,
        limitations: PlanLimitations,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            price,
            validate_days,
            max_dealers: limitations.max_dealers,
            max_properties: limitations.max_properties,
            features: limitations.features,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Snapshot of this plan's ceilings, copied onto a company at assignment time
    pub fn limitations(&self) -> PlanLimitations {
        PlanLimitations {
            max_dealers: self.max_dealers,
            max_properties: self.max_properties,
            features: self.features.clone(),
        }
    }

    /// New active ledger entry for `company_id` starting at `start`
    pub fn history_entry(&self, company_id: Uuid, start: DateTime<Utc>) -> PlanHistoryEntry {
        PlanHistoryEntry {
            id: Uuid::new_v4(),
            company_id,
            plan_id: self.id,
            plan_name: self.name.clone(),
            price: self.price,
            start_date: start,
            end_date: start + Duration::days(i64::from(self.validate_days)),
            status: PlanHistoryStatus::Active,
            purchased_at: start,
        }
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        plan_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::plans::dsl::*;

        plans
            .filter(id.eq(plan_id))
            .select(Plan::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn list_active(conn: &mut AsyncPgConnection) -> Result<Vec<Self>, StoreError> {
        use crate::schema::plans::dsl::*;

        plans
            .filter(is_active.eq(true))
            .order(price.asc())
            .select(Plan::as_select())
            .load(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn create(conn: &mut AsyncPgConnection, plan: &Plan) -> Result<Self, StoreError> {
        diesel::insert_into(plans::table)
            .values(plan)
            .returning(Plan::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }
}

/// Append-only record of plans a company has held
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = plan_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct PlanHistoryEntry {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub company_id: Uuid,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub price: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: PlanHistoryStatus,
    pub purchased_at: DateTime<Utc>,
}

impl PlanHistoryEntry {
    /// Expire every active entry of a company, ending it at `at`
    pub async fn expire_active(
        conn: &mut AsyncPgConnection,
        company: Uuid,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        use crate::schema::plan_history::dsl::*;

        diesel::update(
            plan_history
                .filter(company_id.eq(company))
                .filter(status.eq(PlanHistoryStatus::Active)),
        )
        .set((status.eq(PlanHistoryStatus::Expired), end_date.eq(at)))
        .execute(conn)
        .await
        .map_err(StoreError::from)
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        entry: &PlanHistoryEntry,
    ) -> Result<Self, StoreError> {
        diesel::insert_into(plan_history::table)
            .values(entry)
            .returning(PlanHistoryEntry::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Full history of a company, oldest first
    pub async fn list_for_company(
        conn: &mut AsyncPgConnection,
        company: Uuid,
    ) -> Result<Vec<Self>, StoreError> {
        use crate::schema::plan_history::dsl::*;

        plan_history
            .filter(company_id.eq(company))
            .order(purchased_at.asc())
            .select(PlanHistoryEntry::as_select())
            .load(conn)
            .await
            .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_status_conversion() {
        assert_eq!(PlanHistoryStatus::Active.as_str(), "active");
        assert_eq!(
            PlanHistoryStatus::from_str("cancelled"),
            Ok(PlanHistoryStatus::Cancelled)
        );
        assert!(PlanHistoryStatus::from_str("paused").is_err());
    }

    #[test]
    fn test_history_entry_end_date() {
        let plan = Plan::new(
            "Growth".to_string(),
            String::new(),
            4999,
            30,
            PlanLimitations {
                max_dealers: 10,
                max_properties: 200,
                features: vec!["featured_listings".to_string()],
            },
        );
        let start = Utc::now();
        let entry = plan.history_entry(Uuid::new_v4(), start);

        assert_eq!(entry.status, PlanHistoryStatus::Active);
        assert_eq!(entry.end_date - entry.start_date, Duration::days(30));
        assert_eq!(entry.plan_name, "Growth");
        assert_eq!(entry.price, 4999);
    }

    #[test]
    fn test_limitations_snapshot_is_a_copy() {
        let mut plan = Plan::new(
            "Starter".to_string(),
            String::new(),
            0,
            14,
            PlanLimitations {
                max_dealers: 3,
                max_properties: 25,
                features: vec![],
            },
        );
        let snapshot = plan.limitations();
        plan.max_dealers = 99;

        assert_eq!(snapshot.max_dealers, 3);
    }
}
