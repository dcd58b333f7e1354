//! # Storage and Persistence
//!
//! Database connectivity and the persistence layer for accounts and
//! session tokens.

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod test_support;

pub use crate::config::DatabaseConfig;

pub use migrations::{get_migration_version, run_migrations};
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::{
    AccountRepository, SessionTokenRepository, SqlxAccountRepository, SqlxSessionTokenRepository,
};

use crate::errors::{Error, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| Error::Database {
        source: e,
        context: "Database connectivity check failed".to_string(),
    })?;

    Ok(())
}
