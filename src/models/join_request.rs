// Company Join Request Model
// Single source of truth for dealer -> company affiliation requests

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

use super::dealer_profile::ApprovalStatus;
use crate::db::StoreError;
use crate::schema::company_join_requests;

#[derive(
    Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = company_join_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub id: Uuid,
    pub dealer_profile_id: Uuid,
    pub company_id: Uuid,
    pub status: ApprovalStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub response_reason: Option<String>,
    pub responded_by: Option<Uuid>,
}

impl JoinRequest {
    pub fn new(dealer_profile_id: Uuid, company_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            dealer_profile_id,
            company_id,
            status: ApprovalStatus::Pending,
            requested_at: Utc::now(),
            responded_at: None,
            response_reason: None,
            responded_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    /// Close the request with an outcome
    pub fn resolve(&mut self, outcome: ApprovalStatus, responder: Uuid, reason: Option<String>) {
        self.status = outcome;
        self.responded_at = Some(Utc::now());
        self.responded_by = Some(responder);
        self.response_reason = reason;
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        request_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::company_join_requests::dsl::*;

        company_join_requests
            .filter(id.eq(request_id))
            .select(JoinRequest::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn find_pending_for_dealer(
        conn: &mut AsyncPgConnection,
        profile_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::company_join_requests::dsl::*;

        company_join_requests
            .filter(dealer_profile_id.eq(profile_id))
            .filter(status.eq(ApprovalStatus::Pending))
            .select(JoinRequest::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn latest_for_dealer(
        conn: &mut AsyncPgConnection,
        profile_id: Uuid,
    ) -> Result<Self, StoreError> {
        use crate::schema::company_join_requests::dsl::*;

        company_join_requests
            .filter(dealer_profile_id.eq(profile_id))
            .order(requested_at.desc())
            .select(JoinRequest::as_select())
            .first(conn)
            .await
            .map_err(StoreError::from)
    }

    /// Pending queue of a company, oldest first
    pub async fn list_pending_for_company(
        conn: &mut AsyncPgConnection,
        company: Uuid,
    ) -> Result<Vec<Self>, StoreError> {
        use crate::schema::company_join_requests::dsl::*;

        company_join_requests
            .filter(company_id.eq(company))
            .filter(status.eq(ApprovalStatus::Pending))
            .order(requested_at.asc())
            .select(JoinRequest::as_select())
            .load(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        request: &JoinRequest,
    ) -> Result<Self, StoreError> {
        diesel::insert_into(company_join_requests::table)
            .values(request)
            .returning(JoinRequest::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn save(
        conn: &mut AsyncPgConnection,
        request: &JoinRequest,
    ) -> Result<Self, StoreError> {
        diesel::update(company_join_requests::table.find(request.id))
            .set(request)
            .returning(JoinRequest::as_returning())
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }
}
