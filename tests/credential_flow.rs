//! End-to-end credential lifecycle tests over the service layer.

use std::sync::Arc;

use doorman::auth::models::{
    RegistrationIdentifier, RegistrationRequest, Role, SignInRequest, TokenType,
};
use doorman::auth::{CredentialService, TokenKind, TokenSigner};
use doorman::config::AuthConfig;
use doorman::errors::Error;
use doorman::storage::repositories::{
    SessionTokenRepository, SqlxAccountRepository, SqlxSessionTokenRepository,
};
use doorman::storage::test_support::create_test_pool;

struct Harness {
    service: CredentialService,
    tokens: Arc<SqlxSessionTokenRepository>,
    signer: Arc<TokenSigner>,
}

async fn harness() -> Harness {
    let pool = create_test_pool().await;
    let signer = Arc::new(TokenSigner::new(&AuthConfig::default()));
    let tokens = Arc::new(SqlxSessionTokenRepository::new(pool.clone()));
    let service = CredentialService::new(
        Arc::new(SqlxAccountRepository::new(pool)),
        tokens.clone(),
        signer.clone(),
    );
    Harness { service, tokens, signer }
}

fn registration() -> RegistrationRequest {
    RegistrationRequest {
        identifier: RegistrationIdentifier {
            email: Some("john@x.com".to_string()),
            phone_number: Some("+33615856245".to_string()),
            username: "johndoe".to_string(),
        },
        password: "Abc12345678".to_string(),
    }
}

fn sign_in(identifier: &str, password: &str) -> SignInRequest {
    SignInRequest { identifier: identifier.to_string(), password: password.to_string() }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let h = harness().await;

    // Sign-up: account with default role and preferences, one session token
    let (account, issued) = h.service.sign_up(registration()).await.unwrap();
    assert_eq!(account.role, Role::User);
    assert!(account.connections.is_empty());
    assert_eq!(h.tokens.count_for_account(&account.id).await.unwrap(), 1);

    // Both tokens verify against their own kind and carry the account id
    let access = h.signer.verify(&issued.access_token, TokenKind::Access).unwrap();
    assert_eq!(access.sub, account.id.as_str());
    let refresh = h.signer.verify(&issued.refresh_token, TokenKind::Refresh).unwrap();
    assert_eq!(refresh.sub, account.id.as_str());
    assert_eq!(refresh.user, "john@x.com");

    // Refresh: both tokens re-issued, store updated, still one record
    let refreshed = h.service.refresh(&account).await.unwrap();
    assert_ne!(refreshed.access_token, issued.access_token);
    let stored = h
        .tokens
        .get_token(&account.id, TokenType::Authentication)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.value, refreshed.access_token);
    assert_eq!(h.tokens.count_for_account(&account.id).await.unwrap(), 1);

    // Sign-out: the record is revoked...
    h.service.sign_out(&account.id).await.unwrap();
    assert_eq!(h.tokens.count_for_account(&account.id).await.unwrap(), 0);

    // ...but the unexpired signed token still verifies; revocation is
    // store-side only by design.
    assert!(h.signer.verify(&refreshed.access_token, TokenKind::Access).is_ok());
}

#[tokio::test]
async fn sign_in_works_with_every_identifier_kind() {
    let h = harness().await;
    h.service.sign_up(registration()).await.unwrap();

    for identifier in ["johndoe", "john@x.com", "+33615856245"] {
        let (account, _) =
            h.service.sign_in(&sign_in(identifier, "Abc12345678")).await.unwrap();
        assert_eq!(account.identifier.username, "johndoe", "sign-in by {}", identifier);
    }
}

#[tokio::test]
async fn duplicate_sign_up_conflicts_and_persists_nothing() {
    let h = harness().await;
    h.service.sign_up(registration()).await.unwrap();

    let mut dup = registration();
    dup.identifier.username = "different".to_string();
    // email still collides
    let err = h.service.sign_up(dup).await.unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test]
async fn failed_sign_in_mutates_nothing() {
    let h = harness().await;
    let (account, issued) = h.service.sign_up(registration()).await.unwrap();

    let err = h.service.sign_in(&sign_in("johndoe", "WrongPassword1")).await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));

    let err = h.service.sign_in(&sign_in("nobody", "Abc12345678")).await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));

    let stored = h
        .tokens
        .get_token(&account.id, TokenType::Authentication)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.value, issued.access_token);
}
