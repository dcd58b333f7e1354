//! Credential service: sign-up, sign-in, sign-out and refresh.
//!
//! Orchestrates the password hasher, token signer and token store over a
//! session's `Anonymous -> Authenticated -> Anonymous` lifecycle. Welcome
//! mail is dispatched after the account insert commits, as a detached task
//! whose failure is logged and never propagated.
//!
//! Per-account operations are not serialized: two concurrent sign-ins both
//! supersede the stored token and the last write wins. Uniqueness under
//! concurrent sign-ups rests on the storage-level unique indexes, not on
//! the existence pre-check.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::auth::hashing;
use crate::auth::jwt::TokenSigner;
use crate::auth::models::{
    Account, Identifier, IssuedTokens, NewAccount, Preferences, RegistrationRequest, Role,
    SignInRequest, TokenType,
};
use crate::domain::AccountId;
use crate::errors::{AuthErrorType, Error, Result};
use crate::notifications::NotificationService;
use crate::observability::metrics;
use crate::storage::repositories::{
    AccountRepository, SessionTokenRepository, SqlxAccountRepository, SqlxSessionTokenRepository,
};

/// Pre-computed dummy digest for timing-safe identifier enumeration
/// prevention. When an unknown identifier is used, a bcrypt verification
/// still runs against this digest so the response time matches the
/// known-identifier path.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value")
        .unwrap_or_else(|_| "$2b$10$7EqJtq98hPqEX7fNZaFWoOhi5B0H1mOB1Xb8kZ8eW3nCEy9mW3S1q".to_string())
});

/// Service orchestrating the credential/session lifecycle.
#[derive(Clone)]
pub struct CredentialService {
    account_repository: Arc<dyn AccountRepository>,
    token_repository: Arc<dyn SessionTokenRepository>,
    signer: Arc<TokenSigner>,
    notification_service: Option<Arc<NotificationService>>,
}

impl CredentialService {
    pub fn new(
        account_repository: Arc<dyn AccountRepository>,
        token_repository: Arc<dyn SessionTokenRepository>,
        signer: Arc<TokenSigner>,
    ) -> Self {
        Self { account_repository, token_repository, signer, notification_service: None }
    }

    pub fn with_sqlx(pool: crate::storage::DbPool, signer: Arc<TokenSigner>) -> Self {
        Self::new(
            Arc::new(SqlxAccountRepository::new(pool.clone())),
            Arc::new(SqlxSessionTokenRepository::new(pool)),
            signer,
        )
    }

    /// Attach a notification service for welcome-mail dispatch.
    pub fn with_notifications(mut self, notifications: Arc<NotificationService>) -> Self {
        self.notification_service = Some(notifications);
        self
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `Conflict` when any supplied identifier already belongs to an
    ///   account (pre-checked here; the storage unique indexes cover the
    ///   race where two sign-ups pass the check concurrently)
    /// - `Validation` when the password is shorter than the minimum
    #[instrument(skip(self, request), fields(username = %request.identifier.username))]
    pub async fn sign_up(&self, request: RegistrationRequest) -> Result<(Account, IssuedTokens)> {
        let identifier: Identifier = request.identifier.into();

        if self.account_repository.exists_with_identifier(&identifier).await? {
            metrics::record_authentication("duplicate_identifier");
            return Err(Error::conflict(
                "An account with these identifiers already exists",
                "account",
            ));
        }

        let password_hash = hashing::hash_password(&request.password)?;

        let new_account = NewAccount {
            id: AccountId::new(),
            identifier,
            password_hash,
            role: Role::User,
            preferences: Preferences::default(),
        };

        let account = self.account_repository.create_account(new_account).await?;
        metrics::record_account_created();

        let tokens = self.establish_session(&account).await?;

        if account.identifier.email.is_some() {
            self.dispatch_welcome_mail(account.clone());
        }

        info!(account_id = %account.id, username = %account.identifier.username, "account registered");
        Ok((account, tokens))
    }

    /// Authenticate with any identifier kind and a password.
    ///
    /// # Errors
    ///
    /// - `Auth(InvalidCredentials)` when the identifier resolves to no
    ///   account or the password does not verify
    #[instrument(skip(self, request), fields(identifier = %request.identifier))]
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<(Account, IssuedTokens)> {
        let lookup = self
            .account_repository
            .find_by_identifier_with_password(&request.identifier)
            .await?;

        let (account, password_hash) = match lookup {
            Some(found) => found,
            None => {
                // Keep response time level with the verification path
                if let Err(err) = hashing::verify_password(&request.password, &DUMMY_HASH) {
                    warn!(error = %err, "dummy digest verification failed unexpectedly");
                }
                warn!(identifier = %request.identifier, "sign-in attempt for unknown identifier");
                metrics::record_authentication("unknown_identifier");
                return Err(Error::auth(
                    "Account is not registered",
                    AuthErrorType::InvalidCredentials,
                ));
            }
        };

        if !hashing::verify_password(&request.password, &password_hash)? {
            warn!(account_id = %account.id, "sign-in attempt with incorrect password");
            metrics::record_authentication("invalid_credentials");
            return Err(Error::auth("Password is incorrect", AuthErrorType::InvalidCredentials));
        }

        let tokens = self.establish_session(&account).await?;

        metrics::record_authentication("success");
        info!(account_id = %account.id, "account signed in");
        Ok((account, tokens))
    }

    /// End the caller's session by revoking the stored access-token record.
    ///
    /// The signed access token itself stays verifiable until it expires;
    /// only the store-side record is removed. Idempotent.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn sign_out(&self, account_id: &AccountId) -> Result<()> {
        self.token_repository.remove_token(account_id, TokenType::Authentication).await?;
        metrics::record_token_revoked();
        info!(account_id = %account_id, "account signed out");
        Ok(())
    }

    /// Re-issue both tokens for an already-authenticated caller.
    ///
    /// Identity is established upstream by the guard from the refresh
    /// token; the password is not re-validated.
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub async fn refresh(&self, account: &Account) -> Result<IssuedTokens> {
        let tokens = self.establish_session(account).await?;
        info!(account_id = %account.id, "session refreshed");
        Ok(tokens)
    }

    /// Issue both signed tokens and persist the access token, superseding
    /// any prior record of the same type.
    async fn establish_session(&self, account: &Account) -> Result<IssuedTokens> {
        let account_id = account.id.as_str();

        // Refresh tokens identify the account by its most stable handle;
        // the username is the guaranteed fallback.
        let stable_identifier =
            account.stable_identifier().unwrap_or(account.identifier.username.as_str());

        let access_token = self.signer.issue_access_token(account_id)?;
        let refresh_token = self.signer.issue_refresh_token(account_id, stable_identifier)?;

        let now = Utc::now();
        let access_expires_at = now + self.signer.access_ttl();
        let refresh_expires_at = now + self.signer.refresh_ttl();

        self.token_repository
            .replace_token(
                &account.id,
                TokenType::Authentication,
                access_token.clone(),
                Some(access_expires_at),
            )
            .await?;

        Ok(IssuedTokens { access_token, refresh_token, access_expires_at, refresh_expires_at })
    }

    /// Queue the welcome message after the account insert has committed.
    /// Provider failures are logged and counted, never surfaced.
    fn dispatch_welcome_mail(&self, account: Account) {
        let notifications = match &self.notification_service {
            Some(notifications) => notifications.clone(),
            None => return,
        };

        tokio::spawn(async move {
            if let Err(err) = notifications.send_welcome_message(&account).await {
                warn!(account_id = %account.id, error = %err, "welcome mail dispatch failed");
                metrics::record_mail_dispatch("welcome", false);
            } else {
                metrics::record_mail_dispatch("welcome", true);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenKind;
    use crate::auth::models::RegistrationIdentifier;
    use crate::config::AuthConfig;
    use crate::storage::test_support::create_test_pool;

    async fn test_service() -> (CredentialService, Arc<SqlxSessionTokenRepository>) {
        let pool = create_test_pool().await;
        let signer = Arc::new(TokenSigner::new(&AuthConfig::default()));
        let tokens = Arc::new(SqlxSessionTokenRepository::new(pool.clone()));
        let service = CredentialService::new(
            Arc::new(SqlxAccountRepository::new(pool)),
            tokens.clone(),
            signer,
        );
        (service, tokens)
    }

    fn registration(username: &str, email: Option<&str>) -> RegistrationRequest {
        RegistrationRequest {
            identifier: RegistrationIdentifier {
                email: email.map(str::to_string),
                phone_number: None,
                username: username.to_string(),
            },
            password: "Abc12345678".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_up_creates_account_with_defaults_and_one_session_token() {
        let (service, tokens) = test_service().await;

        let (account, issued) =
            service.sign_up(registration("johndoe", Some("john@x.com"))).await.unwrap();

        assert_eq!(account.role, Role::User);
        assert!(account.connections.is_empty());
        assert_eq!(account.preferences, Preferences::default());

        // Exactly one authentication token record, holding the access token
        assert_eq!(tokens.count_for_account(&account.id).await.unwrap(), 1);
        let stored =
            tokens.get_token(&account.id, TokenType::Authentication).await.unwrap().unwrap();
        assert_eq!(stored.value, issued.access_token);
        assert!(stored.expires_at.is_some());
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicate_identifiers() {
        let (service, _) = test_service().await;

        service.sign_up(registration("johndoe", Some("john@x.com"))).await.unwrap();

        // Same username, different email
        let err = service.sign_up(registration("johndoe", Some("other@x.com"))).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        // Different username, same email
        let err = service.sign_up(registration("janedoe", Some("john@x.com"))).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn sign_up_rejects_short_password() {
        let (service, _) = test_service().await;

        let mut request = registration("johndoe", None);
        request.password = "abc".to_string();

        let err = service.sign_up(request).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn sign_in_accepts_any_identifier_kind() {
        let (service, _) = test_service().await;
        service.sign_up(registration("johndoe", Some("john@x.com"))).await.unwrap();

        for identifier in ["johndoe", "john@x.com"] {
            let request = SignInRequest {
                identifier: identifier.to_string(),
                password: "Abc12345678".to_string(),
            };
            let (account, _) = service.sign_in(&request).await.unwrap();
            assert_eq!(account.identifier.username, "johndoe");
        }
    }

    #[tokio::test]
    async fn sign_in_with_unknown_identifier_fails() {
        let (service, _) = test_service().await;

        let request = SignInRequest {
            identifier: "ghost".to_string(),
            password: "Abc12345678".to_string(),
        };
        let err = service.sign_in(&request).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth { error_type: AuthErrorType::InvalidCredentials, .. }
        ));
    }

    #[tokio::test]
    async fn sign_in_with_wrong_password_leaves_session_token_untouched() {
        let (service, tokens) = test_service().await;
        let (account, issued) = service.sign_up(registration("johndoe", None)).await.unwrap();

        let request = SignInRequest {
            identifier: "johndoe".to_string(),
            password: "WrongPassword1".to_string(),
        };
        let err = service.sign_in(&request).await.unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));

        // No token mutation occurred
        let stored =
            tokens.get_token(&account.id, TokenType::Authentication).await.unwrap().unwrap();
        assert_eq!(stored.value, issued.access_token);
    }

    #[tokio::test]
    async fn sign_in_supersedes_previous_session_token() {
        let (service, tokens) = test_service().await;
        let (account, first) = service.sign_up(registration("johndoe", None)).await.unwrap();

        let request = SignInRequest {
            identifier: "johndoe".to_string(),
            password: "Abc12345678".to_string(),
        };
        let (_, second) = service.sign_in(&request).await.unwrap();

        assert_ne!(first.access_token, second.access_token);
        assert_eq!(tokens.count_for_account(&account.id).await.unwrap(), 1);
        let stored =
            tokens.get_token(&account.id, TokenType::Authentication).await.unwrap().unwrap();
        assert_eq!(stored.value, second.access_token);
    }

    #[tokio::test]
    async fn refresh_reissues_both_tokens_and_restores_access() {
        let (service, tokens) = test_service().await;
        let (account, first) = service.sign_up(registration("johndoe", None)).await.unwrap();

        let refreshed = service.refresh(&account).await.unwrap();

        assert_ne!(refreshed.access_token, first.access_token);
        let stored =
            tokens.get_token(&account.id, TokenType::Authentication).await.unwrap().unwrap();
        assert_eq!(stored.value, refreshed.access_token);
        assert_eq!(tokens.count_for_account(&account.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sign_out_revokes_record_and_is_idempotent() {
        let (service, tokens) = test_service().await;
        let (account, _) = service.sign_up(registration("johndoe", None)).await.unwrap();

        service.sign_out(&account.id).await.unwrap();
        assert_eq!(tokens.count_for_account(&account.id).await.unwrap(), 0);

        // Second sign-out is a no-op, not an error
        service.sign_out(&account.id).await.unwrap();
    }

    #[tokio::test]
    async fn sign_out_does_not_invalidate_the_signed_token_itself() {
        // Chosen behavior: revocation is store-side only. Guard verification
        // of the signed token is stateless, so an unexpired access token
        // still verifies after sign-out.
        let (service, _) = test_service().await;
        let (account, issued) = service.sign_up(registration("johndoe", None)).await.unwrap();

        service.sign_out(&account.id).await.unwrap();

        let signer = TokenSigner::new(&AuthConfig::default());
        let claims = signer.verify(&issued.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, account.id.as_str());
    }

    #[tokio::test]
    async fn refresh_token_prefers_email_then_phone_then_username() {
        let (service, _) = test_service().await;
        let signer = TokenSigner::new(&AuthConfig::default());

        let (_, with_email) =
            service.sign_up(registration("johndoe", Some("john@x.com"))).await.unwrap();
        let claims = signer.verify(&with_email.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.user, "john@x.com");

        let (_, username_only) = service.sign_up(registration("janedoe", None)).await.unwrap();
        let claims = signer.verify(&username_only.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.user, "janedoe");
    }
}
