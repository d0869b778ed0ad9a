// Authenticated caller extracted from a validated bearer token

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Account, Role};

/// The account behind a request, re-resolved from the store on every call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub account_id: Uuid,
    pub role: Role,
    pub company_id: Option<Uuid>,
}

impl From<&Account> for AuthenticatedAccount {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            role: account.role,
            company_id: account.company_id,
        }
    }
}
