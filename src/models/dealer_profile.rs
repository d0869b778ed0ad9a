// Dealer Profile Database Model
// One-to-one business profile of a dealer account, reviewed before the dealer goes live

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::impl_text_sql;
use crate::db::StoreError;
use crate::schema::dealer_profiles;

/// Review outcome shared by dealer profiles and company join requests
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
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(format!("Invalid approval status: {}", s)),
        }
    }
}

impl_text_sql!(ApprovalStatus);

/// Editable business attributes submitted by the dealer
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct DealerProfileData {
    #[validate(length(min = 1, max = 255, message = "Business name is required"))]
    pub business_name: String,

    #[validate(length(min = 1, max = 100, message = "License number is required"))]
    pub license_number: String,

    #[serde(default)]
    pub office_address: String,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub city: String,

    #[serde(default)]
    #[validate(range(min = 0, max = 80, message = "Years of experience must be between 0 and 80"))]
    pub years_of_experience: i32,

    #[serde(default)]
    pub specializations: Vec<String>,

    #[serde(default)]
    pub description: String,

    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,

    #[validate(url)]
    pub facebook_url: Option<String>,

    #[validate(url)]
    pub instagram_url: Option<String>,

    #[validate(url)]
    pub linkedin_url: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub government_id: String,

    #[serde(default)]
    pub documents: Vec<String>,
}

/// Dealer profile database model
#[derive(
    Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = dealer_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct DealerProfile {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub account_id: Uuid,
    pub business_name: String,
    pub license_number: String,
    pub office_address: String,
    pub city: String,
    pub years_of_experience: i32,
    pub specializations: Vec<String>,
    pub description: String,
    pub website: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub government_id: String,
    pub documents: Vec<String>,
    pub company_id: Option<Uuid>,
    /// Whether this dealer currently occupies one of the company's dealer seats
    pub seat_held: bool,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DealerProfile {
    /// New profile in the review queue
    pub fn new(account_id: Uuid, company_id: Option<Uuid>, data: DealerProfileData) -> Self {
        let now = Utc::now();
        let mut profile = Self {
            id: Uuid::new_v4(),
            account_id,
            business_name: String::new(),
            license_number: String::new(),
            office_address: String::new(),
            city: String::new(),
            years_of_experience: 0,
            specializations: Vec::new(),
            description: String::new(),
            website: None,
            facebook_url: None,
            instagram_url: None,
            linkedin_url: None,
            government_id: String::new(),
            documents: Vec::new(),
            company_id,
            seat_held: false,
            approval_status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: String::new(),
            created_at: now,
            updated_at: now,
        };
        profile.apply(data);
        profile
    }

    /// Overwrite every editable field and send the profile back to review.
    /// Affiliation fields (`company_id`, `seat_held`) are left alone.
    pub fn resubmit(&mut self, data: DealerProfileData) {
        self.apply(data);
        self.approval_status = ApprovalStatus::Pending;
        self.approved_by = None;
        self.approved_at = None;
        self.rejection_reason = String::new();
        self.updated_at = Utc::now();
    }

    fn apply(&mut self, data: DealerProfileData) {
        self.business_name = data.business_name.trim().to_string();
        self.license_number = data.license_number.trim().to_string();
        self.office_address = data.office_address;
        self.city = data.city;
        self.years_of_experience = data.years_of_experience;
        self.specializations = data.specializations;
        self.description = data.description;
        self.website = data.website;
        self.facebook_url = data.facebook_url;
        self.instagram_url = data.instagram_url;
        self.linkedin_url = data.linkedin_url;
        self.government_id = data.government_id;
        self.documents = data.documents;
    }

    pub fn is_independent(&self) -> bool {
        self.company_id.is_none()
    }

    /// Find profile by ID
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        profile_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::dealer_profiles::dsl::*;

        dealer_profiles
            .filter(id.eq(profile_id))
            .select(DealerProfile::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Same as `find_by_id` but holds the row lock until the transaction ends
    pub async fn find_for_update(
        conn: &mut AsyncPgConnection,
        profile_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::dealer_profiles::dsl::*;

        dealer_profiles
            .filter(id.eq(profile_id))
            .select(DealerProfile::as_select())
            .for_update()
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn find_by_account(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::dealer_profiles::dsl::*;

        dealer_profiles
            .filter(account_id.eq(owner))
            .select(DealerProfile::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Pending profiles, optionally restricted to a single company
    pub async fn list_pending(
        conn: &mut AsyncPgConnection,
        company: Option<Uuid>,
    ) -> Result<Vec<Self>, StoreError> {
        use crate::schema::dealer_profiles::dsl::*;

        let mut query = dealer_profiles
            .filter(approval_status.eq(ApprovalStatus::Pending))
            .into_boxed();

        if let Some(company) = company {
            query = query.filter(company_id.eq(company));
        }

        query
            .order(updated_at.asc())
            .select(DealerProfile::as_select())
            .load(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        profile: &DealerProfile,
    ) -> Result<Self, StoreError> {
        diesel::insert_into(dealer_profiles::table)
            .values(profile)
            .returning(DealerProfile::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn save(
        conn: &mut AsyncPgConnection,
        profile: &DealerProfile,
    ) -> Result<Self, StoreError> {
        diesel::update(dealer_profiles::table.find(profile.id))
            .set(profile)
            .returning(DealerProfile::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }
}
