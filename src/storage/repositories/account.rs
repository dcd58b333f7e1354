//! Account repository.
//!
//! CRUD and identifier-lookup operations over the `accounts` table. All
//! identifier lookups are OR-equality across the email, phone number and
//! username columns; uniqueness rests on the storage-level unique indexes.

use crate::auth::models::{Account, Identifier, NewAccount, Preferences, Role};
use crate::domain::AccountId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

// Database row structures

#[derive(Debug, Clone, FromRow)]
struct AccountRow {
    pub id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub preferences: String,
    pub connections: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ACCOUNT_COLUMNS: &str = "id, email, phone_number, username, password_hash, role, \
                               preferences, connections, created_at, updated_at";

// Repository trait

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create a new account
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Get an account by ID
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Find accounts whose email, phone number or username equals the raw
    /// identifier, oldest first
    async fn find_by_identifier(&self, raw: &str) -> Result<Vec<Account>>;

    /// Same lookup but also returning the stored password hash, for
    /// authentication
    async fn find_by_identifier_with_password(
        &self,
        raw: &str,
    ) -> Result<Option<(Account, String)>>;

    /// Check whether any account already uses one of the given identifiers
    async fn exists_with_identifier(&self, identifier: &Identifier) -> Result<bool>;

    /// List all accounts (with pagination)
    async fn list_accounts(&self, limit: i64, offset: i64) -> Result<Vec<Account>>;

    /// Count total accounts
    async fn count_accounts(&self) -> Result<i64>;
}

// SQLx implementation

#[derive(Debug, Clone)]
pub struct SqlxAccountRepository {
    pool: DbPool,
}

impl SqlxAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_account(&self, row: AccountRow) -> Result<Account> {
        let role = Role::from_str(&row.role)
            .map_err(|_| Error::validation(format!("Unknown account role '{}'", row.role)))?;

        let preferences: Preferences = serde_json::from_str(&row.preferences).map_err(|err| {
            Error::internal(format!("Failed to parse preferences JSON: {}", err))
        })?;

        let connections = serde_json::from_str(&row.connections).map_err(|err| {
            Error::internal(format!("Failed to parse connections JSON: {}", err))
        })?;

        Ok(Account {
            id: AccountId::from_string(row.id),
            identifier: Identifier {
                email: row.email,
                phone_number: row.phone_number,
                username: row.username,
            },
            role,
            preferences,
            connections,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl AccountRepository for SqlxAccountRepository {
    #[instrument(
        skip(self, account),
        fields(account_id = %account.id, username = %account.identifier.username),
        name = "db_create_account"
    )]
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let preferences = serde_json::to_string(&account.preferences).map_err(|err| {
            Error::internal(format!("Failed to serialize preferences: {}", err))
        })?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, phone_number, username, password_hash, role, preferences, connections, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.identifier.email)
        .bind(&account.identifier.phone_number)
        .bind(&account.identifier.username)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(&preferences)
        .bind("[]")
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to create account".to_string(),
        })?;

        self.get_account(&account.id)
            .await?
            .ok_or_else(|| Error::internal("Account not found after creation"))
    }

    #[instrument(skip(self), fields(account_id = %id), name = "db_get_account")]
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch account".to_string(),
        })?;

        row.map(|r| self.row_to_account(r)).transpose()
    }

    #[instrument(skip(self), fields(identifier = %raw), name = "db_find_by_identifier")]
    async fn find_by_identifier(&self, raw: &str) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1 OR phone_number = $1 OR username = $1 \
             ORDER BY created_at",
            ACCOUNT_COLUMNS
        ))
        .bind(raw)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to find account by identifier".to_string(),
        })?;

        rows.into_iter().map(|r| self.row_to_account(r)).collect()
    }

    #[instrument(skip(self), fields(identifier = %raw), name = "db_find_with_password")]
    async fn find_by_identifier_with_password(
        &self,
        raw: &str,
    ) -> Result<Option<(Account, String)>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1 OR phone_number = $1 OR username = $1 \
             ORDER BY created_at LIMIT 1",
            ACCOUNT_COLUMNS
        ))
        .bind(raw)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch account with password".to_string(),
        })?;

        if let Some(row) = row {
            let password_hash = row.password_hash.clone();
            let account = self.row_to_account(row)?;
            Ok(Some((account, password_hash)))
        } else {
            Ok(None)
        }
    }

    #[instrument(
        skip(self, identifier),
        fields(username = %identifier.username),
        name = "db_exists_with_identifier"
    )]
    async fn exists_with_identifier(&self, identifier: &Identifier) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM accounts
            WHERE username = $1
               OR (email IS NOT NULL AND email = $2)
               OR (phone_number IS NOT NULL AND phone_number = $3)
            "#,
        )
        .bind(&identifier.username)
        .bind(&identifier.email)
        .bind(&identifier.phone_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to check identifier existence".to_string(),
        })?;

        Ok(count > 0)
    }

    #[instrument(skip(self), fields(limit = limit, offset = offset), name = "db_list_accounts")]
    async fn list_accounts(&self, limit: i64, offset: i64) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to list accounts".to_string(),
        })?;

        rows.into_iter().map(|r| self.row_to_account(r)).collect()
    }

    #[instrument(skip(self), name = "db_count_accounts")]
    async fn count_accounts(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to count accounts".to_string(),
            })?;

        Ok(count)
    }
}
