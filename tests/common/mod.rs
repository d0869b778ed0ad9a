// Common test utilities and helper structs
// Builds the real router over the in-memory store and a recording mail transport
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use realty_backend_core::{
    app::AppState,
    app_config::{BootstrapConfig, EmailConfig, EmailProvider, WorkflowConfig},
    bootstrap_super_admin, build_router,
    db::{MarketplaceStore, MemoryStore},
    services::{
        email::{EmailError, EmailMessage, MailTransport},
        EmailService, JwtConfig, JwtService,
    },
    utils::{PasswordConfig, PasswordService},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-integration-tests-only-32chars";
pub const SUPER_ADMIN_EMAIL: &str = "root@platform.test";
pub const SUPER_ADMIN_PASSWORD: &str = "rootpass";
pub const PASSWORD: &str = "secret1";

/// Mail transport that keeps every message for inspection
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<bool>,
}

impl RecordingTransport {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to(&self, email: &str) -> Vec<EmailMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.to.iter().any(|to| to == email))
            .collect()
    }

    /// Make every following send fail
    pub fn fail_sends(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Code from the most recent verification email sent to `email`
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.messages_to(email).iter().rev().find_map(|m| {
            let text = m.text.as_deref()?;
            let (_, rest) = text.split_once("Your verification code is: ")?;
            Some(rest.chars().take_while(|c| c.is_ascii_digit()).collect())
        })
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if *self.failing.lock().unwrap() {
            return Err(EmailError::ServiceUnavailable);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub fn test_email_config() -> EmailConfig {
    EmailConfig {
        provider: EmailProvider::Log,
        resend_api_key: String::new(),
        resend_api_url: "http://localhost/emails".to_string(),
        from_email: "noreply@realty.test".to_string(),
        from_name: "Realty Test".to_string(),
        support_email: "support@realty.test".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
    }
}

/// Cheap Argon2 parameters so tests stay fast
pub fn fast_passwords() -> PasswordService {
    PasswordService::new(PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_length: 32,
    })
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub mail: Arc<RecordingTransport>,
    pub jwt_service: JwtService,
}

impl TestApp {
    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    pub fn put(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "PUT", uri)
    }

    pub fn patch(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "PATCH", uri)
    }

    pub fn code_for(&self, email: &str) -> String {
        self.mail
            .last_code_for(email)
            .unwrap_or_else(|| panic!("no verification code sent to {}", email))
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: &'static str,
    uri: String,
    token: Option<String>,
    body: Option<Vec<u8>>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &'static str, uri: &str) -> Self {
        Self {
            app,
            method,
            uri: uri.to_string(),
            token: None,
            body: None,
        }
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Some(serde_json::to_vec(body).unwrap());
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub async fn send(self) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        if let Some(token) = &self.token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match self.body {
            Some(bytes) => builder
                .header("content-type", "application/json")
                .body(Body::from(bytes))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.app.clone().oneshot(request).await.unwrap();
        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Assert the status and return the JSON body
    pub async fn expect(self, status: StatusCode) -> Value {
        let actual = self.status();
        let body: Value = self.json().await;
        assert_eq!(actual, status, "unexpected status, body: {}", body);
        body
    }
}

/// Setup test application with all dependencies
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(WorkflowConfig::default()).await
}

pub async fn setup_test_app_with(settings: WorkflowConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mail = Arc::new(RecordingTransport::default());
    let passwords = fast_passwords();

    let email = EmailService::with_transport(test_email_config(), mail.clone()).unwrap();
    let jwt_service = JwtService::new(JwtConfig::new(
        TEST_JWT_SECRET,
        3600,
        "realty-test",
        "realty-test",
    ));

    bootstrap_super_admin(
        store.as_ref(),
        &passwords,
        &BootstrapConfig {
            super_admin_email: Some(SUPER_ADMIN_EMAIL.to_string()),
            super_admin_password: Some(SUPER_ADMIN_PASSWORD.to_string()),
            super_admin_name: "Platform Admin".to_string(),
        },
    )
    .await
    .unwrap();

    let shared: Arc<dyn MarketplaceStore> = store.clone();
    let state = AppState::new(shared, email, jwt_service.clone(), passwords, settings);
    let app = build_router(state, &["*".to_string()]);

    TestApp {
        app,
        store,
        mail,
        jwt_service,
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, Uuid::new_v4().simple())
}

// =============================================================================
// FLOW HELPERS
// =============================================================================

pub async fn login(app: &TestApp, email: &str, password: &str) -> String {
    let body = app
        .post("/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    body["data"]["token"].as_str().unwrap().to_string()
}

pub async fn super_admin_token(app: &TestApp) -> String {
    login(app, SUPER_ADMIN_EMAIL, SUPER_ADMIN_PASSWORD).await
}

pub async fn register(app: &TestApp, email: &str, role: &str, company_id: Option<Uuid>) -> Value {
    app.post("/auth/register")
        .json(&json!({
            "name": "Test Person",
            "email": email,
            "password": PASSWORD,
            "phone": "+15550001",
            "role": role,
            "companyId": company_id,
        }))
        .send()
        .await
        .json()
        .await
}

/// Register and verify; returns the verified account's token
pub async fn verified_account(
    app: &TestApp,
    email: &str,
    role: &str,
    company_id: Option<Uuid>,
) -> String {
    let registered = register(app, email, role, company_id).await;
    assert_eq!(registered["success"], true, "registration failed: {}", registered);

    let body = app
        .post("/auth/verify-otp")
        .json(&json!({ "email": email, "otp": app.code_for(email) }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    body["data"]["token"].as_str().unwrap().to_string()
}

pub fn profile_payload(business_name: &str) -> Value {
    json!({
        "businessName": business_name,
        "licenseNumber": "RERA-001",
        "officeAddress": "12 Market Street",
        "city": "Pune",
        "yearsOfExperience": 5,
        "specializations": ["residential"],
        "description": "Residential sales"
    })
}

/// Verified dealer with a submitted profile; returns (token, profile id)
pub async fn dealer_with_profile(
    app: &TestApp,
    email: &str,
    company_id: Option<Uuid>,
) -> (String, Uuid) {
    let token = verified_account(app, email, "dealer", company_id).await;
    let body = app
        .post("/auth/dealer/profile")
        .bearer(&token)
        .json(&profile_payload("Test Realty"))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;
    let profile_id = body["data"]["dealerProfile"]["id"].as_str().unwrap();
    (token, profile_id.parse().unwrap())
}

pub fn company_payload(company_email: &str, owner_email: &str) -> Value {
    json!({
        "company": {
            "name": "Acme Realty",
            "email": company_email,
            "phone": "+15550100",
            "licenseNumber": "LIC-100",
            "address": "1 Main Road",
            "city": "Pune",
            "description": "Brokerage"
        },
        "owner": {
            "name": "Olivia Owner",
            "email": owner_email,
            "password": PASSWORD,
            "phone": "+15550101"
        }
    })
}

/// Registered, owner-verified and platform-approved company.
/// Returns (company id, owner token).
pub async fn approved_company(app: &TestApp) -> (Uuid, String) {
    let company_email = unique_email("office");
    let owner_email = unique_email("owner");

    let body = app
        .post("/company/register")
        .json(&company_payload(&company_email, &owner_email))
        .send()
        .await
        .expect(StatusCode::CREATED)
        .await;
    let company_id: Uuid = body["data"]["company"]["id"].as_str().unwrap().parse().unwrap();

    app.post("/company/verify-owner")
        .json(&json!({ "email": owner_email, "otp": app.code_for(&owner_email) }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;

    let admin = super_admin_token(app).await;
    app.patch(&format!("/company/{}/status", company_id))
        .bearer(&admin)
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .expect(StatusCode::OK)
        .await;

    let owner_token = login(app, &owner_email, PASSWORD).await;
    (company_id, owner_token)
}

/// Create a plan as the super admin and return its id
pub async fn create_plan(app: &TestApp, name: &str, max_dealers: i32, max_properties: i32) -> Uuid {
    let admin = super_admin_token(app).await;
    let body = app
        .post("/subscriptions/plans")
        .bearer(&admin)
        .json(&json!({
            "name": name,
            "description": "",
            "price": 999,
            "validateDays": 30,
            "limitations": { "maxDealers": max_dealers, "maxProperties": max_properties }
        }))
        .send()
        .await
        .expect(StatusCode::CREATED)
        .await;
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}
