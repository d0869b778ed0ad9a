/// Implements Diesel `Text` conversions for enums that expose `as_str` and `FromStr`.
macro_rules! impl_text_sql {
    ($ty:ty) => {
        impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for $ty
        where
            DB: diesel::backend::Backend,
            String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
        {
            fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
                let value = String::from_sql(bytes)?;
                <$ty as std::str::FromStr>::from_str(&value).map_err(|e| e.into())
            }
        }

        impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for $ty
        where
            DB: diesel::backend::Backend,
            str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
        {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, DB>,
            ) -> diesel::serialize::Result {
                self.as_str().to_sql(out)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use impl_text_sql;

pub mod account;
pub mod auth;
pub mod company;
pub mod dealer_profile;
pub mod join_request;
pub mod plan;

// Re-export common types
pub use account::{Account, Role};
pub use auth::*;
pub use company::{Company, CompanyStatus, PlanLimitations, SubscriptionStatus};
pub use dealer_profile::{ApprovalStatus, DealerProfile, DealerProfileData};
pub use join_request::JoinRequest;
pub use plan::{Plan, PlanHistoryEntry, PlanHistoryStatus};
