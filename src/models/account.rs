// Account Database Model
// Any person who can authenticate: platform admins, company owners, dealers and plain users

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use uuid::Uuid;

use super::impl_text_sql;
use crate::db::StoreError;
use crate::schema::accounts;

/// Account role, chosen at registration and fixed afterwards
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    CompanyAdmin,
    Dealer,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::CompanyAdmin => "company_admin",
            Role::Dealer => "dealer",
            Role::User => "user",
        }
    }

    /// Roles a visitor may pick on the public registration form
    pub fn is_self_registrable(&self) -> bool {
        matches!(self, Role::Dealer | Role::User)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "company_admin" => Ok(Role::CompanyAdmin),
            "dealer" => Ok(Role::Dealer),
            "user" => Ok(Role::User),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl_text_sql!(Role);

/// Account database model
#[derive(
    Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub verified: bool,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires: Option<DateTime<Utc>>,
    pub dealer_profile_completed: bool,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stable, content-derived account identifier.
/// The same email/phone pair always yields the same value.
pub fn derive_external_id(email: &str, phone: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(phone.trim().as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("USR-{}", &hex[..16])
}

impl Account {
    /// Build a fresh unverified account bound to a pending one-time code
    #[allow(clippy::too_many_arguments)]
    pub fn new_unverified(
        name: String,
        email: String,
        phone: String,
        password_hash: String,
        role: Role,
        company_id: Option<Uuid>,
        otp: String,
        otp_expires: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id: derive_external_id(&email, &phone),
            name,
            email,
            phone,
            password_hash,
            role,
            verified: false,
            otp: Some(otp),
            otp_expires: Some(otp_expires),
            dealer_profile_completed: false,
            company_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_dealer(&self) -> bool {
        self.role == Role::Dealer
    }

    /// Find account by ID
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::accounts::dsl::*;

        accounts
            .filter(id.eq(account_id))
            .select(Account::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Find account by email. Emails are stored normalized to lowercase.
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> Result<Self, StoreError> {
        use crate::schema::accounts::dsl::*;

        accounts
            .filter(email.eq(email_str))
            .select(Account::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn list_by_role(
        conn: &mut AsyncPgConnection,
        wanted: Role,
    ) -> Result<Vec<Self>, StoreError> {
        use crate::schema::accounts::dsl::*;

        accounts
            .filter(role.eq(wanted))
            .filter(verified.eq(true))
            .order(created_at.asc())
            .select(Account::as_select())
            .load(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn create(conn: &mut AsyncPgConnection, account: &Account) -> Result<Self, StoreError> {
        diesel::insert_into(accounts::table)
            .values(account)
            .returning(Account::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Overwrite every mutable column of an existing account
    pub async fn save(conn: &mut AsyncPgConnection, account: &Account) -> Result<Self, StoreError> {
        diesel::update(accounts::table.find(account.id))
            .set(account)
            .returning(Account::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn delete(conn: &mut AsyncPgConnection, account_id: Uuid) -> Result<(), StoreError> {
        diesel::delete(accounts::table.find(account_id))
            .execute(conn)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }

    pub async fn set_company(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
        company: Option<Uuid>,
    ) -> Result<(), StoreError> {
        use crate::schema::accounts::dsl::*;

        diesel::update(accounts.find(account_id))
            .set((company_id.eq(company), updated_at.eq(Utc::now())))
            .execute(conn)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }

    pub async fn mark_profile_completed(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
    ) -> Result<(), StoreError> {
        use crate::schema::accounts::dsl::*;

        diesel::update(accounts.find(account_id))
            .set((dealer_profile_completed.eq(true), updated_at.eq(Utc::now())))
            .execute(conn)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion() {
        assert_eq!(Role::SuperAdmin.as_str(), "super_admin");
        assert_eq!(Role::CompanyAdmin.as_str(), "company_admin");
        assert_eq!(Role::from_str("dealer"), Ok(Role::Dealer));
        assert_eq!(Role::from_str("user"), Ok(Role::User));
        assert!(Role::from_str("admin").is_err());
    }

    #[test]
    fn test_role_serde_matches_storage_form() {
        let json = serde_json::to_string(&Role::CompanyAdmin).unwrap();
        assert_eq!(json, "\"company_admin\"");
        let parsed: Role = serde_json::from_str("\"super_admin\"").unwrap();
        assert_eq!(parsed, Role::SuperAdmin);
    }

    #[test]
    fn test_self_registrable_roles() {
        assert!(Role::Dealer.is_self_registrable());
        assert!(Role::User.is_self_registrable());
        assert!(!Role::CompanyAdmin.is_self_registrable());
        assert!(!Role::SuperAdmin.is_self_registrable());
    }

    #[test]
    fn test_external_id_is_content_derived() {
        let a = derive_external_id("A@X.com", "+1");
        let b = derive_external_id("a@x.com ", "+1");
        let c = derive_external_id("a@x.com", "+2");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("USR-"));
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn test_secrets_not_serialized() {
        let account = Account::new_unverified(
            "A".to_string(),
            "a@x.com".to_string(),
            "+1".to_string(),
            "$argon2id$hash".to_string(),
            Role::User,
            None,
            "123456".to_string(),
            Utc::now(),
        );

        let value = serde_json::to_value(&account).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("otp"));
        assert!(!obj.contains_key("otpExpires"));
        assert_eq!(obj["role"], "user");
        assert_eq!(obj["verified"], false);
        assert!(obj.contains_key("userId"));
    }
}
