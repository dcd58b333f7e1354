//! Read-side account queries backing the users endpoints.

use std::sync::Arc;

use crate::auth::identifier::{IdentifierResolver, ResolvedIdentifier};
use crate::auth::models::Account;
use crate::domain::AccountId;
use crate::errors::Result;
use crate::storage::repositories::{AccountRepository, SqlxAccountRepository};

/// Service for account lookups and identifier resolution.
#[derive(Clone)]
pub struct AccountService {
    account_repository: Arc<dyn AccountRepository>,
    resolver: IdentifierResolver,
}

impl AccountService {
    pub fn new(account_repository: Arc<dyn AccountRepository>) -> Self {
        let resolver = IdentifierResolver::new(account_repository.clone());
        Self { account_repository, resolver }
    }

    pub fn with_sqlx(pool: crate::storage::DbPool) -> Self {
        Self::new(Arc::new(SqlxAccountRepository::new(pool)))
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        self.account_repository.get_account(id).await
    }

    /// List accounts with pagination.
    pub async fn list_accounts(&self, limit: i64, offset: i64) -> Result<Vec<Account>> {
        self.account_repository.list_accounts(limit, offset).await
    }

    /// Count total accounts.
    pub async fn count_accounts(&self) -> Result<i64> {
        self.account_repository.count_accounts().await
    }

    /// Resolve a raw login string to a partial canonical identifier.
    /// `None` means no account matched.
    pub async fn identify(&self, raw: &str) -> Result<Option<ResolvedIdentifier>> {
        self.resolver.resolve(raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{Identifier, NewAccount, Preferences, Role};
    use crate::storage::test_support::create_test_pool;

    async fn seeded_service() -> (AccountService, AccountId) {
        let pool = create_test_pool().await;
        let repo = Arc::new(SqlxAccountRepository::new(pool));

        let account = repo
            .create_account(NewAccount {
                id: AccountId::new(),
                identifier: Identifier {
                    email: Some("john@x.com".to_string()),
                    phone_number: Some("+33615856245".to_string()),
                    username: "johndoe".to_string(),
                },
                password_hash: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
                role: Role::User,
                preferences: Preferences::default(),
            })
            .await
            .unwrap();

        (AccountService::new(repo), account.id)
    }

    #[tokio::test]
    async fn get_account_by_id() {
        let (service, id) = seeded_service().await;

        let account = service.get_account(&id).await.unwrap().unwrap();
        assert_eq!(account.identifier.username, "johndoe");

        assert!(service.get_account(&AccountId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn identify_returns_partial_identifier_without_leaking_fields() {
        let (service, _) = seeded_service().await;

        // Resolution by phone exposes the phone and username but not the email
        let by_phone = service.identify("+33615856245").await.unwrap().unwrap();
        assert_eq!(by_phone.username, "johndoe");
        assert_eq!(by_phone.phone_number.as_deref(), Some("+33615856245"));
        assert!(by_phone.email.is_none());

        // Resolution by username exposes only the username
        let by_username = service.identify("johndoe").await.unwrap().unwrap();
        assert!(by_username.email.is_none());
        assert!(by_username.phone_number.is_none());

        // Resolution by email exposes the email
        let by_email = service.identify("john@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.email.as_deref(), Some("john@x.com"));
    }

    #[tokio::test]
    async fn identify_unknown_is_none_not_error() {
        let (service, _) = seeded_service().await;
        assert!(service.identify("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_and_count() {
        let (service, _) = seeded_service().await;
        assert_eq!(service.count_accounts().await.unwrap(), 1);
        assert_eq!(service.list_accounts(10, 0).await.unwrap().len(), 1);
    }
}
