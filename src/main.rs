use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realty_backend_core::{app_config::AppConfig, build_router, initialize_app_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realty_backend_core=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(
        environment = %config.server.environment,
        "Starting realty backend on {}",
        config.server.bind_address
    );

    let state = initialize_app_state(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;

    let app = build_router(state, &config.server.cors_allowed_origins);
    let app = if config.features.enable_tracing {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!("Listening on {}", config.server.bind_address);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
