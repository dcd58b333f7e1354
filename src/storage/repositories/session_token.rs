//! Session token repository.
//!
//! Persists the currently valid signed token of each kind per account. The
//! replace operation is a delete-then-insert inside one transaction so a
//! concurrent refresh for the same account cannot leave two live rows; the
//! unique index on (account_id, token_type) is the final arbiter.

use crate::auth::models::{SessionToken, TokenType};
use crate::domain::{AccountId, SessionTokenId};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct SessionTokenRow {
    pub id: String,
    pub account_id: String,
    pub token_type: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait SessionTokenRepository: Send + Sync {
    /// Upsert the token of the given type for the account: any pre-existing
    /// record of the same (account, type) pair is superseded atomically
    async fn replace_token(
        &self,
        account_id: &AccountId,
        token_type: TokenType,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<SessionToken>;

    /// Remove the token of the given type; removing an absent token is a no-op
    async fn remove_token(&self, account_id: &AccountId, token_type: TokenType) -> Result<()>;

    /// Get the current token of the given type for the account
    async fn get_token(
        &self,
        account_id: &AccountId,
        token_type: TokenType,
    ) -> Result<Option<SessionToken>>;

    /// Count live token records for the account
    async fn count_for_account(&self, account_id: &AccountId) -> Result<i64>;

    /// Delete all records whose store-level expiry is in the past; returns
    /// the number of rows removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct SqlxSessionTokenRepository {
    pool: DbPool,
}

impl SqlxSessionTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_token(&self, row: SessionTokenRow) -> Result<SessionToken> {
        let token_type = TokenType::from_str(&row.token_type).map_err(|_| {
            Error::validation(format!("Unknown session token type '{}'", row.token_type))
        })?;

        Ok(SessionToken {
            id: SessionTokenId::from_string(row.id),
            account_id: AccountId::from_string(row.account_id),
            token_type,
            value: row.value,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[async_trait]
impl SessionTokenRepository for SqlxSessionTokenRepository {
    #[instrument(
        skip(self, value),
        fields(account_id = %account_id, token_type = %token_type),
        name = "db_replace_token"
    )]
    async fn replace_token(
        &self,
        account_id: &AccountId,
        token_type: TokenType,
        value: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<SessionToken> {
        let id = SessionTokenId::new();

        let mut tx = self.pool.begin().await.map_err(|err| Error::Database {
            source: err,
            context: "Failed to begin token replacement".to_string(),
        })?;

        sqlx::query("DELETE FROM session_tokens WHERE account_id = $1 AND token_type = $2")
            .bind(account_id.as_str())
            .bind(token_type.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to supersede previous session token".to_string(),
            })?;

        sqlx::query(
            r#"
            INSERT INTO session_tokens (id, account_id, token_type, value, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.as_str())
        .bind(account_id.as_str())
        .bind(token_type.as_str())
        .bind(&value)
        .bind(Utc::now())
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to store session token".to_string(),
        })?;

        tx.commit().await.map_err(|err| Error::Database {
            source: err,
            context: "Failed to commit token replacement".to_string(),
        })?;

        self.get_token(account_id, token_type)
            .await?
            .ok_or_else(|| Error::internal("Session token not found after creation"))
    }

    #[instrument(
        skip(self),
        fields(account_id = %account_id, token_type = %token_type),
        name = "db_remove_token"
    )]
    async fn remove_token(&self, account_id: &AccountId, token_type: TokenType) -> Result<()> {
        sqlx::query("DELETE FROM session_tokens WHERE account_id = $1 AND token_type = $2")
            .bind(account_id.as_str())
            .bind(token_type.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to remove session token".to_string(),
            })?;

        Ok(())
    }

    #[instrument(
        skip(self),
        fields(account_id = %account_id, token_type = %token_type),
        name = "db_get_token"
    )]
    async fn get_token(
        &self,
        account_id: &AccountId,
        token_type: TokenType,
    ) -> Result<Option<SessionToken>> {
        let row = sqlx::query_as::<_, SessionTokenRow>(
            "SELECT id, account_id, token_type, value, created_at, expires_at \
             FROM session_tokens WHERE account_id = $1 AND token_type = $2",
        )
        .bind(account_id.as_str())
        .bind(token_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch session token".to_string(),
        })?;

        row.map(|r| self.row_to_token(r)).transpose()
    }

    #[instrument(skip(self), fields(account_id = %account_id), name = "db_count_tokens")]
    async fn count_for_account(&self, account_id: &AccountId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM session_tokens WHERE account_id = $1",
        )
        .bind(account_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to count session tokens".to_string(),
        })?;

        Ok(count)
    }

    #[instrument(skip(self), name = "db_delete_expired_tokens")]
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM session_tokens WHERE expires_at IS NOT NULL AND expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to delete expired session tokens".to_string(),
        })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{Identifier, NewAccount, Preferences, Role};
    use crate::storage::repositories::{AccountRepository, SqlxAccountRepository};
    use crate::storage::test_support::create_test_pool;
    use chrono::Duration;

    async fn seeded_account(pool: &DbPool) -> AccountId {
        let repo = SqlxAccountRepository::new(pool.clone());
        let account = repo
            .create_account(NewAccount {
                id: AccountId::new(),
                identifier: Identifier {
                    email: None,
                    phone_number: None,
                    username: format!("user-{}", AccountId::new()),
                },
                password_hash: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
                role: Role::User,
                preferences: Preferences::default(),
            })
            .await
            .unwrap();
        account.id
    }

    #[tokio::test]
    async fn replace_token_supersedes_previous() {
        let pool = create_test_pool().await;
        let repo = SqlxSessionTokenRepository::new(pool.clone());
        let account_id = seeded_account(&pool).await;

        let first = repo
            .replace_token(&account_id, TokenType::Authentication, "token-a".to_string(), None)
            .await
            .unwrap();
        let second = repo
            .replace_token(&account_id, TokenType::Authentication, "token-b".to_string(), None)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(repo.count_for_account(&account_id).await.unwrap(), 1);

        let current =
            repo.get_token(&account_id, TokenType::Authentication).await.unwrap().unwrap();
        assert_eq!(current.value, "token-b");
    }

    #[tokio::test]
    async fn remove_token_is_idempotent() {
        let pool = create_test_pool().await;
        let repo = SqlxSessionTokenRepository::new(pool.clone());
        let account_id = seeded_account(&pool).await;

        repo.replace_token(&account_id, TokenType::Authentication, "token-a".to_string(), None)
            .await
            .unwrap();

        repo.remove_token(&account_id, TokenType::Authentication).await.unwrap();
        // Second removal of an absent token is not an error
        repo.remove_token(&account_id, TokenType::Authentication).await.unwrap();

        assert!(repo
            .get_token(&account_id, TokenType::Authentication)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_expired_removes_only_past_expiries() {
        let pool = create_test_pool().await;
        let repo = SqlxSessionTokenRepository::new(pool.clone());
        let expired_owner = seeded_account(&pool).await;
        let live_owner = seeded_account(&pool).await;

        let now = Utc::now();
        repo.replace_token(
            &expired_owner,
            TokenType::Authentication,
            "stale".to_string(),
            Some(now - Duration::minutes(5)),
        )
        .await
        .unwrap();
        repo.replace_token(
            &live_owner,
            TokenType::Authentication,
            "fresh".to_string(),
            Some(now + Duration::minutes(30)),
        )
        .await
        .unwrap();

        let removed = repo.delete_expired(now).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_token(&expired_owner, TokenType::Authentication).await.unwrap().is_none());
        assert!(repo.get_token(&live_owner, TokenType::Authentication).await.unwrap().is_some());
    }
}
