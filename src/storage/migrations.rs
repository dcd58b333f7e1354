//! # Database Migration Management
//!
//! Schema evolution using SQL migrations embedded in the binary, executed
//! automatically on application startup when auto_migrate is enabled. A
//! tracking table records which versions have been applied.

use crate::errors::{Error, Result};
use crate::storage::DbPool;
use sqlx::Row;
use tracing::info;

/// Migrations embedded at compile time, ordered by version prefix.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "20250301000001_create_accounts",
        include_str!("../../migrations/20250301000001_create_accounts.sql"),
    ),
    (
        "20250301000002_create_session_tokens",
        include_str!("../../migrations/20250301000002_create_session_tokens.sql"),
    ),
];

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    create_migration_table(pool).await?;

    let applied = applied_versions(pool).await?;

    let mut migrations_run = 0;
    for (name, sql) in MIGRATIONS {
        let version = extract_version(name)?;

        if applied.contains(&version) {
            continue;
        }

        info!(version = version, migration = name, "Applying migration");

        let mut tx = pool.begin().await.map_err(|e| Error::Database {
            source: e,
            context: format!("Failed to begin transaction for migration {}", name),
        })?;

        // SQLite accepts only one statement per execute call
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| Error::Database {
                source: e,
                context: format!("Failed to apply migration {}", name),
            })?;
        }

        sqlx::query("INSERT INTO _doorman_migrations (version, description, installed_on) VALUES ($1, $2, $3)")
            .bind(version)
            .bind(*name)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database {
                source: e,
                context: format!("Failed to record migration {}", name),
            })?;

        tx.commit().await.map_err(|e| Error::Database {
            source: e,
            context: format!("Failed to commit migration {}", name),
        })?;

        migrations_run += 1;
    }

    info!(migrations_run = migrations_run, "Database migrations complete");
    Ok(())
}

/// Get the highest applied migration version, if any
pub async fn get_migration_version(pool: &DbPool) -> Result<Option<i64>> {
    create_migration_table(pool).await?;

    let row = sqlx::query("SELECT MAX(version) AS version FROM _doorman_migrations")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::Database {
            source: e,
            context: "Failed to query migration version".to_string(),
        })?;

    Ok(row.try_get::<Option<i64>, _>("version").unwrap_or(None))
}

async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _doorman_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            installed_on TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database {
        source: e,
        context: "Failed to create migration tracking table".to_string(),
    })?;

    Ok(())
}

async fn applied_versions(pool: &DbPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT version FROM _doorman_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Database {
            source: e,
            context: "Failed to list applied migrations".to_string(),
        })?;

    Ok(rows.into_iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect())
}

fn extract_version(name: &str) -> Result<i64> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<i64>()
        .map_err(|_| Error::validation(format!("Migration name has no version prefix: {}", name)))
}
