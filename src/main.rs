use std::time::Duration;

use doorman::{
    api::start_api_server,
    auth::cleanup_service::CleanupService,
    config::AppConfig,
    observability::init_observability,
    storage::create_pool,
    Result, APP_NAME, VERSION,
};
use tracing::{error, info};

/// Interval between expired session token sweeps.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; must happen before config reads the environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = AppConfig::from_env()?;
    init_observability(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting Doorman account backend");

    let pool = create_pool(&config.database).await?;

    // Background sweeper for expired session token records
    let cleanup = CleanupService::with_sqlx(pool.clone());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = cleanup.run_once().await {
                error!(error = %e, "session token sweep failed");
            }
        }
    });

    start_api_server(&config, pool).await?;

    info!("Doorman shutdown completed");
    Ok(())
}
