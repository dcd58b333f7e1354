//! Test database utilities for in-library and integration tests.
//!
//! An in-memory SQLite pool is pinned to a single connection: every
//! connection to `sqlite://:memory:` opens its own database, so a larger
//! pool would scatter the schema across invisible databases.

use crate::config::DatabaseConfig;
use crate::storage::{create_pool, migrations, DbPool};

/// Create a migrated single-connection in-memory pool.
pub async fn create_test_pool() -> DbPool {
    let config = DatabaseConfig {
        url: "sqlite://:memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        auto_migrate: false,
        ..Default::default()
    };

    let pool = create_pool(&config).await.expect("test pool");
    migrations::run_migrations(&pool).await.expect("test migrations");
    pool
}
