// Authorization policies
// One function per (resource, action). Each takes the caller and, where it matters,
// the company that owns the target, and either allows or fails with `Forbidden`.

use uuid::Uuid;

use crate::{middleware::AuthenticatedAccount, models::Role, utils::WorkflowError};

fn forbidden(reason: &str) -> WorkflowError {
    WorkflowError::Forbidden(reason.to_string())
}

fn require_super_admin(caller: &AuthenticatedAccount, action: &str) -> Result<(), WorkflowError> {
    if caller.role == Role::SuperAdmin {
        Ok(())
    } else {
        Err(forbidden(&format!("only a super admin may {}", action)))
    }
}

/// Company admins act on their own company only; yields that company's id
fn require_company_admin(
    caller: &AuthenticatedAccount,
    action: &str,
) -> Result<Uuid, WorkflowError> {
    match (caller.role, caller.company_id) {
        (Role::CompanyAdmin, Some(company_id)) => Ok(company_id),
        (Role::CompanyAdmin, None) => Err(forbidden("company admin has no company")),
        _ => Err(forbidden(&format!("only a company admin may {}", action))),
    }
}

/// Approve or reject a dealer profile.
///
/// Affiliated dealers are reviewed by the admin of their own company, independent
/// dealers by a super admin. Neither may act on the other's dealers.
pub fn review_dealer(
    caller: &AuthenticatedAccount,
    dealer_company_id: Option<Uuid>,
) -> Result<(), WorkflowError> {
    match dealer_company_id {
        Some(company_id) => {
            if caller.role == Role::CompanyAdmin && caller.company_id == Some(company_id) {
                Ok(())
            } else {
                Err(forbidden(
                    "only the admin of the dealer's company may review this dealer",
                ))
            }
        },
        None => {
            if caller.role == Role::SuperAdmin {
                Ok(())
            } else {
                Err(forbidden("only a super admin may review independent dealers"))
            }
        },
    }
}

/// Which pending dealers the caller may list: `None` is every dealer,
/// `Some(id)` is the dealers of one company
pub fn pending_dealer_scope(caller: &AuthenticatedAccount) -> Result<Option<Uuid>, WorkflowError> {
    match caller.role {
        Role::SuperAdmin => Ok(None),
        Role::CompanyAdmin => require_company_admin(caller, "list pending dealers").map(Some),
        _ => Err(forbidden("dealer review queue is restricted to admins")),
    }
}

/// List, inspect and change the status of any company
pub fn manage_companies(caller: &AuthenticatedAccount) -> Result<(), WorkflowError> {
    require_super_admin(caller, "manage companies")
}

/// Read the caller's own company
pub fn view_own_company(caller: &AuthenticatedAccount) -> Result<Uuid, WorkflowError> {
    require_company_admin(caller, "view their company")
}

/// List and answer join requests addressed to the caller's company
pub fn manage_join_requests(caller: &AuthenticatedAccount) -> Result<Uuid, WorkflowError> {
    require_company_admin(caller, "manage join requests")
}

pub fn assign_plans(caller: &AuthenticatedAccount) -> Result<(), WorkflowError> {
    require_super_admin(caller, "assign plans")
}

pub fn create_plans(caller: &AuthenticatedAccount) -> Result<(), WorkflowError> {
    require_super_admin(caller, "create plans")
}

/// Self-service plan change for the caller's own company
pub fn change_own_plan(caller: &AuthenticatedAccount) -> Result<Uuid, WorkflowError> {
    require_company_admin(caller, "change the company plan")
}

pub fn check_own_limits(caller: &AuthenticatedAccount) -> Result<Uuid, WorkflowError> {
    require_company_admin(caller, "check plan limits")
}
