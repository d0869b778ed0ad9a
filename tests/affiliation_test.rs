// Integration tests for dealer join requests and company seat limits

use axum::http::StatusCode;
use realty_backend_core::db::MarketplaceStore;
use serde_json::json;
use uuid::Uuid;

mod common;
use common::{
    approved_company, create_plan, dealer_with_profile, setup_test_app, super_admin_token,
    unique_email, verified_account, TestApp,
};

async fn request_join(app: &TestApp, token: &str, company_id: Uuid) -> Uuid {
    let body = app
        .post("/company-join/request")
        .bearer(token)
        .json(&json!({ "companyId": company_id }))
        .send()
        .await
        .expect(StatusCode::CREATED)
        .await;
    assert_eq!(body["data"]["status"], "pending");
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_directory_lists_approved_companies_only() {
    let app = setup_test_app().await;
    let (company_id, _) = approved_company(&app).await;

    // A second company that never gets approved
    app.post("/company/register")
        .json(&common::company_payload(
            &unique_email("office"),
            &unique_email("owner"),
        ))
        .send()
        .await
        .expect(StatusCode::CREATED)
        .await;

    let body = app
        .get("/company-join/companies-list?search=pune")
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], company_id.to_string());
    assert_eq!(listed[0]["canJoin"], true);
    assert_eq!(listed[0]["dealerSlots"], 2);

    let body = app
        .get("/company-join/companies-list?search=nowhere")
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_request_accepted() {
    let app = setup_test_app().await;
    let (company_id, owner_token) = approved_company(&app).await;
    let (dealer_token, profile_id) = dealer_with_profile(&app, &unique_email("indie"), None).await;

    let request_id = request_join(&app, &dealer_token, company_id).await;

    let pending = app
        .get("/company-join/company/pending")
        .bearer(&owner_token)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(pending["data"]["dealerLimit"], 2);
    assert_eq!(pending["data"]["currentDealers"], 0);
    assert_eq!(pending["data"]["canAcceptMore"], true);
    let requests = pending["data"]["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["requestId"], request_id.to_string());
    assert_eq!(requests[0]["dealer"]["businessName"], "Test Realty");

    let body = app
        .post(&format!("/company-join/company/respond/{}", request_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["status"], "approved");

    let company = app.store.find_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.total_dealers, 1);
    let profile = app.store.find_dealer_profile(profile_id).await.unwrap().unwrap();
    assert_eq!(profile.company_id, Some(company_id));
    assert!(profile.seat_held);
    let account = app.store.find_account(profile.account_id).await.unwrap().unwrap();
    assert_eq!(account.company_id, Some(company_id));

    let view = app
        .get("/company-join/dealer/request")
        .bearer(&dealer_token)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(view["data"]["request"]["status"], "approved");
    assert_eq!(view["data"]["companyName"], "Acme Realty");

    // Answered requests cannot be answered again
    let body = app
        .post(&format!("/company-join/company/respond/{}", request_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "reject" }))
        .send()
        .await
        .expect(StatusCode::NOT_FOUND)
        .await;
    assert_eq!(body["error"], "REQUEST_NOT_FOUND");

    // An affiliated dealer cannot ask again
    let body = app
        .post("/company-join/request")
        .bearer(&dealer_token)
        .json(&json!({ "companyId": company_id }))
        .send()
        .await
        .expect(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(body["error"], "ALREADY_AFFILIATED");
}

#[tokio::test]
async fn test_join_request_rejected() {
    let app = setup_test_app().await;
    let (company_id, owner_token) = approved_company(&app).await;
    let (dealer_token, profile_id) = dealer_with_profile(&app, &unique_email("indie"), None).await;
    let request_id = request_join(&app, &dealer_token, company_id).await;

    let body = app
        .post(&format!("/company-join/company/respond/{}", request_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "reject", "reason": "Not hiring" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["responseReason"], "Not hiring");

    let company = app.store.find_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.total_dealers, 0);
    let profile = app.store.find_dealer_profile(profile_id).await.unwrap().unwrap();
    assert!(profile.company_id.is_none());

    // Free to ask again
    request_join(&app, &dealer_token, company_id).await;
}

#[tokio::test]
async fn test_seat_limit_blocks_join_approval() {
    let app = setup_test_app().await;
    let (company_id, owner_token) = approved_company(&app).await;

    let plan_id = create_plan(&app, "Solo", 1, 10).await;
    let admin = super_admin_token(&app).await;
    app.post("/subscriptions/assign-plan")
        .bearer(&admin)
        .json(&json!({ "companyId": company_id, "planId": plan_id }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    app.store.set_company_usage(company_id, 1, 0).unwrap();

    let (dealer_token, _) = dealer_with_profile(&app, &unique_email("late"), None).await;
    let request_id = request_join(&app, &dealer_token, company_id).await;

    let body = app
        .post(&format!("/company-join/company/respond/{}", request_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(body["error"], "SEAT_LIMIT_REACHED");

    let company = app.store.find_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.total_dealers, 1);

    let pending = app
        .get("/company-join/company/pending")
        .bearer(&owner_token)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(pending["data"]["canAcceptMore"], false);
    let requests = pending["data"]["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["requestId"], request_id.to_string());
}

#[tokio::test]
async fn test_seats_fill_up_one_by_one() {
    let app = setup_test_app().await;
    let (company_id, owner_token) = approved_company(&app).await;

    // Trial allows two dealers
    let mut outcomes = Vec::new();
    for n in 0..3 {
        let (token, _) = dealer_with_profile(&app, &unique_email(&format!("d{}", n)), None).await;
        let request_id = request_join(&app, &token, company_id).await;
        let response = app
            .post(&format!("/company-join/company/respond/{}", request_id))
            .bearer(&owner_token)
            .json(&json!({ "action": "approve" }))
            .send()
            .await;
        outcomes.push(response.status());
    }

    assert_eq!(
        outcomes,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::BAD_REQUEST]
    );
    let company = app.store.find_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.total_dealers, company.max_dealers);
}

#[tokio::test]
async fn test_join_request_preconditions() {
    let app = setup_test_app().await;
    let (company_id, _) = approved_company(&app).await;

    // Users are not dealers
    let user_token = verified_account(&app, &unique_email("user"), "user", None).await;
    let body = app
        .post("/company-join/request")
        .bearer(&user_token)
        .json(&json!({ "companyId": company_id }))
        .send()
        .await
        .expect(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(body["error"], "NOT_A_DEALER");

    // Dealers need a profile first
    let bare_token = verified_account(&app, &unique_email("bare"), "dealer", None).await;
    let body = app
        .post("/company-join/request")
        .bearer(&bare_token)
        .json(&json!({ "companyId": company_id }))
        .send()
        .await
        .expect(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(body["error"], "PROFILE_REQUIRED");

    let (token, _) = dealer_with_profile(&app, &unique_email("indie"), None).await;

    let body = app
        .post("/company-join/request")
        .bearer(&token)
        .json(&json!({ "companyId": Uuid::new_v4() }))
        .send()
        .await
        .expect(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(body["error"], "COMPANY_UNAVAILABLE");

    request_join(&app, &token, company_id).await;
    let body = app
        .post("/company-join/request")
        .bearer(&token)
        .json(&json!({ "companyId": company_id }))
        .send()
        .await
        .expect(StatusCode::CONFLICT)
        .await;
    assert_eq!(body["error"], "JOIN_REQUEST_EXISTS");
}

#[tokio::test]
async fn test_company_admin_answers_only_own_requests() {
    let app = setup_test_app().await;
    let (company_a, _) = approved_company(&app).await;
    let (_, owner_b) = approved_company(&app).await;
    let (dealer_token, _) = dealer_with_profile(&app, &unique_email("indie"), None).await;
    let request_id = request_join(&app, &dealer_token, company_a).await;

    let body = app
        .post(&format!("/company-join/company/respond/{}", request_id))
        .bearer(&owner_b)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::NOT_FOUND)
        .await;
    assert_eq!(body["error"], "REQUEST_NOT_FOUND");

    // Dealers cannot answer at all
    app.post(&format!("/company-join/company/respond/{}", request_id))
        .bearer(&dealer_token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::FORBIDDEN)
        .await;
}

#[tokio::test]
async fn test_join_response_survives_mail_outage() {
    let app = setup_test_app().await;
    let (company_id, owner_token) = approved_company(&app).await;
    let (dealer_token, profile_id) = dealer_with_profile(&app, &unique_email("offline"), None).await;
    let request_id = request_join(&app, &dealer_token, company_id).await;
    app.mail.fail_sends(true);

    let body = app
        .post(&format!("/company-join/company/respond/{}", request_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["status"], "approved");

    let company = app.store.find_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.total_dealers, 1);
    let profile = app.store.find_dealer_profile(profile_id).await.unwrap().unwrap();
    assert_eq!(profile.company_id, Some(company_id));
}
