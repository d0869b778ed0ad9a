// Migration orchestrator
// Embedded in the application binary for distroless container compatibility

pub mod diesel;

use std::error::Error;
use tracing::{error, info};

/// Run embedded PostgreSQL migrations
pub async fn run_all_migrations(database_url: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("[MIGRATIONS] Running Diesel (PostgreSQL) migrations...");

    match diesel::run_migrations(database_url).await {
        Ok(applied_count) => {
            if applied_count > 0 {
                info!("[MIGRATIONS] ✓ Applied {} Diesel migrations", applied_count);
            } else {
                info!("[MIGRATIONS] ✓ Diesel migrations up to date");
            }
            Ok(())
        },
        Err(e) => {
            error!("[MIGRATIONS] ✗ Diesel migration failed: {}", e);
            Err(format!("Diesel migration failed: {}", e).into())
        },
    }
}
