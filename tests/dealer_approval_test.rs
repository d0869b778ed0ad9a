// Integration tests for dealer onboarding and dealer review

use axum::http::StatusCode;
use realty_backend_core::db::MarketplaceStore;
use serde_json::json;

mod common;
use common::{
    approved_company, dealer_with_profile, profile_payload, setup_test_app, super_admin_token,
    unique_email, verified_account,
};

#[tokio::test]
async fn test_dealer_onboarding_flow() {
    let app = setup_test_app().await;
    let email = unique_email("dealer");

    common::register(&app, &email, "dealer", None).await;
    let body = app
        .post("/auth/verify-otp")
        .json(&json!({ "email": email, "otp": app.code_for(&email) }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["dealerStatus"], "profile_incomplete");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let status = app
        .get("/auth/dealer/status")
        .bearer(&token)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(status["data"]["hasDealerProfile"], false);
    assert_eq!(status["data"]["status"], "profile_incomplete");

    let body = app
        .post("/auth/dealer/profile")
        .bearer(&token)
        .json(&profile_payload("X"))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["dealerProfile"]["approvalStatus"], "pending");
    assert_eq!(body["data"]["dealerProfile"]["businessName"], "X");
    assert_eq!(body["data"]["status"], "pending_approval");

    let account = app.store.find_account_by_email(&email).await.unwrap().unwrap();
    assert!(account.dealer_profile_completed);

    let status = app
        .get("/auth/dealer/status")
        .bearer(&token)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(status["data"]["hasDealerProfile"], true);
    assert_eq!(status["data"]["approvalStatus"], "pending");
}

#[tokio::test]
async fn test_profile_requires_dealer_role() {
    let app = setup_test_app().await;
    let token = verified_account(&app, &unique_email("user"), "user", None).await;

    let body = app
        .post("/auth/dealer/profile")
        .bearer(&token)
        .json(&profile_payload("Nope"))
        .send()
        .await
        .expect(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(body["error"], "NOT_A_DEALER");
}

#[tokio::test]
async fn test_resubmission_replaces_profile_and_resets_review() {
    let app = setup_test_app().await;
    let (token, profile_id) = dealer_with_profile(&app, &unique_email("resub"), None).await;
    let admin = super_admin_token(&app).await;

    app.put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&admin)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;

    let body = app
        .post("/auth/dealer/profile")
        .bearer(&token)
        .json(&profile_payload("Second Name"))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["dealerProfile"]["id"], profile_id.to_string());
    assert_eq!(body["data"]["dealerProfile"]["businessName"], "Second Name");
    assert_eq!(body["data"]["dealerProfile"]["approvalStatus"], "pending");

    let stored = app.store.find_dealer_profile(profile_id).await.unwrap().unwrap();
    assert_eq!(stored.business_name, "Second Name");
    assert_eq!(stored.approval_status.as_str(), "pending");
}

#[tokio::test]
async fn test_super_admin_reviews_independent_dealers() {
    let app = setup_test_app().await;
    let (dealer_token, profile_id) = dealer_with_profile(&app, &unique_email("indie"), None).await;
    let admin = super_admin_token(&app).await;

    let pending = app
        .get("/auth/admin/dealers/pending")
        .bearer(&admin)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    let ids: Vec<&str> = pending["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&profile_id.to_string().as_str()));

    let body = app
        .put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&admin)
        .json(&json!({ "action": "reject", "reason": "License could not be verified" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["approvalStatus"], "rejected");
    assert_eq!(body["data"]["rejectionReason"], "License could not be verified");

    // The dealer learns the outcome by email and through the status endpoint
    let status = app
        .get("/auth/dealer/status")
        .bearer(&dealer_token)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(status["data"]["approvalStatus"], "rejected");
}

#[tokio::test]
async fn test_company_admin_cannot_approve_independent_dealer() {
    let app = setup_test_app().await;
    let (_, owner_token) = approved_company(&app).await;
    let (_, profile_id) = dealer_with_profile(&app, &unique_email("indie"), None).await;

    let body = app
        .put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::FORBIDDEN)
        .await;
    assert_eq!(body["error"], "FORBIDDEN");

    let profile = app.store.find_dealer_profile(profile_id).await.unwrap().unwrap();
    assert_eq!(profile.approval_status.as_str(), "pending");
}

#[tokio::test]
async fn test_super_admin_cannot_approve_company_dealer() {
    let app = setup_test_app().await;
    let (company_id, _) = approved_company(&app).await;
    let (_, profile_id) =
        dealer_with_profile(&app, &unique_email("staff"), Some(company_id)).await;
    let admin = super_admin_token(&app).await;

    app.put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&admin)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::FORBIDDEN)
        .await;
}

#[tokio::test]
async fn test_company_admin_approves_own_dealer_and_claims_seat() {
    let app = setup_test_app().await;
    let (company_id, owner_token) = approved_company(&app).await;
    let (_, profile_id) =
        dealer_with_profile(&app, &unique_email("staff"), Some(company_id)).await;

    let pending = app
        .get("/auth/admin/dealers/pending")
        .bearer(&owner_token)
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    let pending = pending["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["companyName"], "Acme Realty");

    let body = app
        .put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["approvalStatus"], "approved");
    assert_eq!(body["data"]["seatHeld"], true);

    let company = app.store.find_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.total_dealers, 1);
}

#[tokio::test]
async fn test_company_dealer_approval_respects_seat_limit() {
    let app = setup_test_app().await;
    let (company_id, owner_token) = approved_company(&app).await;
    let (_, profile_id) =
        dealer_with_profile(&app, &unique_email("staff"), Some(company_id)).await;

    // Trial allows two dealers; both seats are taken
    app.store.set_company_usage(company_id, 2, 0).unwrap();

    let body = app
        .put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&owner_token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(body["error"], "SEAT_LIMIT_REACHED");

    let profile = app.store.find_dealer_profile(profile_id).await.unwrap().unwrap();
    assert_eq!(profile.approval_status.as_str(), "pending");
    let company = app.store.find_company(company_id).await.unwrap().unwrap();
    assert_eq!(company.total_dealers, 2);
}

#[tokio::test]
async fn test_dealers_cannot_review() {
    let app = setup_test_app().await;
    let (token, profile_id) = dealer_with_profile(&app, &unique_email("self"), None).await;

    app.get("/auth/admin/dealers/pending")
        .bearer(&token)
        .send()
        .await
        .expect(StatusCode::FORBIDDEN)
        .await;
    app.put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&token)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::FORBIDDEN)
        .await;
}

#[tokio::test]
async fn test_unknown_dealer_profile() {
    let app = setup_test_app().await;
    let admin = super_admin_token(&app).await;

    let body = app
        .put(&format!("/auth/admin/dealers/{}", uuid::Uuid::new_v4()))
        .bearer(&admin)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::NOT_FOUND)
        .await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_profile_submission_survives_mail_outage() {
    let app = setup_test_app().await;
    let email = unique_email("offline");
    let token = verified_account(&app, &email, "dealer", None).await;
    app.mail.fail_sends(true);

    let body = app
        .post("/auth/dealer/profile")
        .bearer(&token)
        .json(&profile_payload("Quiet Realty"))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["dealerProfile"]["approvalStatus"], "pending");

    let account = app.store.find_account_by_email(&email).await.unwrap().unwrap();
    assert!(account.dealer_profile_completed);
}

#[tokio::test]
async fn test_dealer_review_survives_mail_outage() {
    let app = setup_test_app().await;
    let (_, profile_id) = dealer_with_profile(&app, &unique_email("offline"), None).await;
    let admin = super_admin_token(&app).await;
    app.mail.fail_sends(true);

    let body = app
        .put(&format!("/auth/admin/dealers/{}", profile_id))
        .bearer(&admin)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    assert_eq!(body["data"]["approvalStatus"], "approved");

    let profile = app.store.find_dealer_profile(profile_id).await.unwrap().unwrap();
    assert_eq!(profile.approval_status.as_str(), "approved");
}
