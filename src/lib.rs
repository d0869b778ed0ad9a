// Library exports for the realty marketplace backend
// Exposes the workflow services, the router and the startup helpers

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

// Re-export commonly used types
pub use app::AppState;
pub use app_config::AppConfig;
pub use db::{MarketplaceStore, MemoryStore, PgStore, StoreError};
pub use middleware::{auth_middleware, AuthenticatedAccount};
pub use models::AccessTokenClaims;
pub use services::{EmailService, JwtConfig, JwtError, JwtService};
pub use utils::{PasswordService, WorkflowError};

// Re-export handler route builders
pub use handlers::{auth_routes, company_join_routes, company_routes, subscription_routes};

use app_config::{BootstrapConfig, StoreBackend};
use models::{Account, Role};

/// Build the application state from configuration.
/// Opens the pool and runs embedded migrations for the Postgres backend.
pub async fn initialize_app_state(
    config: &AppConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let store: Arc<dyn MarketplaceStore> = match config.store_backend {
        StoreBackend::Postgres => {
            info!("Initializing database pool...");
            let pool = db::create_diesel_pool(db::DieselDatabaseConfig::from(&config.database))
                .await?;

            if config.features.disable_embedded_migrations {
                info!("Embedded migrations disabled");
            } else {
                info!("Running embedded migrations...");
                migrations::run_all_migrations(&config.database.url).await?;
            }

            Arc::new(PgStore::new(pool))
        },
        StoreBackend::Memory => {
            if config.is_production() {
                warn!("In-memory store selected in production; records are lost on restart");
            } else {
                info!("Using the in-memory store");
            }
            Arc::new(MemoryStore::new())
        },
    };

    let passwords = PasswordService::default();
    let email = EmailService::new(config.email.clone())?;
    let jwt = JwtService::new(JwtConfig::from_app_config(&config.jwt));

    bootstrap_super_admin(store.as_ref(), &passwords, &config.bootstrap).await?;

    Ok(AppState::new(
        store,
        email,
        jwt,
        passwords,
        config.workflow.clone(),
    ))
}

/// Seed the platform super admin if it does not exist yet.
/// Returns whether an account was created.
pub async fn bootstrap_super_admin(
    store: &dyn MarketplaceStore,
    passwords: &PasswordService,
    bootstrap: &BootstrapConfig,
) -> Result<bool, WorkflowError> {
    let (Some(email), Some(password)) = (
        bootstrap.super_admin_email.as_deref(),
        bootstrap.super_admin_password.as_deref(),
    ) else {
        return Ok(false);
    };

    let email = utils::normalize_email(email);
    if store.find_account_by_email(&email).await?.is_some() {
        return Ok(false);
    }

    let mut admin = Account::new_unverified(
        bootstrap.super_admin_name.clone(),
        email,
        String::new(),
        passwords.hash(password)?,
        Role::SuperAdmin,
        None,
        String::new(),
        Utc::now(),
    );
    admin.verified = true;
    admin.otp = None;
    admin.otp_expires = None;

    let admin = store.create_account(&admin).await?;
    info!(account_id = %admin.id, "Super admin account created");

    Ok(true)
}

/// Assemble the full router with the CORS layer
pub fn build_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/company", company_routes(state.clone()))
        .nest("/company-join", company_join_routes(state.clone()))
        .nest("/subscriptions", subscription_routes(state.clone()))
        .layer(cors_layer(cors_allowed_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            },
        })
        .collect();
    layer.allow_origin(origins)
}

// Health check handler
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = Utc::now().to_rfc3339();

    let (healthy, store_health) = match state.store.health_check().await {
        Ok(()) => (
            true,
            serde_json::json!({ "status": "healthy", "error": null }),
        ),
        Err(e) => (
            false,
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Store unavailable: {}", e)
            }),
        ),
    };

    let response = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "realty-backend",
        "timestamp": timestamp,
        "components": { "store": store_health }
    });

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
