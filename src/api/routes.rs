use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::{require_access, GuardState, RouteGuard, RoutePolicy};
use crate::auth::models::Role;
use crate::auth::{AccountService, CredentialService, TokenSigner};
use crate::config::AppConfig;
use crate::notifications::{MailjetClient, NotificationService};
use crate::storage::repositories::{
    AccountRepository, SqlxAccountRepository, SqlxSessionTokenRepository,
};
use crate::storage::DbPool;

use super::{docs, handlers};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub credential_service: CredentialService,
    pub account_service: AccountService,
    pub notification_service: Option<Arc<NotificationService>>,
    pub signer: Arc<TokenSigner>,
    pub account_repository: Arc<dyn AccountRepository>,
    pub secure_cookies: bool,
}

impl ApiState {
    /// Wire the full service stack over the given pool.
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        let signer = Arc::new(TokenSigner::new(&config.auth));
        let account_repository: Arc<dyn AccountRepository> =
            Arc::new(SqlxAccountRepository::new(pool.clone()));
        let token_repository = Arc::new(SqlxSessionTokenRepository::new(pool));

        let notification_service = if config.mail.enabled {
            let client = Arc::new(MailjetClient::new(&config.mail));
            Some(Arc::new(NotificationService::new(client, &config.mail)))
        } else {
            None
        };

        let mut credential_service = CredentialService::new(
            account_repository.clone(),
            token_repository,
            signer.clone(),
        );
        if let Some(notifications) = &notification_service {
            credential_service = credential_service.with_notifications(notifications.clone());
        }

        Self {
            credential_service,
            account_service: AccountService::new(account_repository.clone()),
            notification_service,
            signer,
            account_repository,
            secure_cookies: config.auth.secure_cookies,
        }
    }
}

/// Build the application router.
///
/// Routing is default-closed: every route carries an explicit
/// [`RoutePolicy`], and the public routes are the documented exceptions.
pub fn build_router(state: ApiState) -> Router {
    let policy_layer = {
        let signer = state.signer.clone();
        let account_repository = state.account_repository.clone();
        move |policy: RoutePolicy| {
            let guard: GuardState =
                Arc::new(RouteGuard::new(signer.clone(), account_repository.clone(), policy));
            middleware::from_fn_with_state(guard, require_access)
        }
    };

    let api = Router::new()
        .merge(
            Router::new()
                .route("/health", get(handlers::health_handler))
                .route_layer(policy_layer(RoutePolicy::public())),
        )
        .merge(
            Router::new()
                .route("/api/v1/auth/sign-up", post(handlers::sign_up_handler))
                .route_layer(policy_layer(RoutePolicy::public())),
        )
        .merge(
            Router::new()
                .route("/api/v1/auth/sign-in", post(handlers::sign_in_handler))
                .route_layer(policy_layer(RoutePolicy::public())),
        )
        .merge(
            Router::new()
                .route("/api/v1/auth/sign-out", post(handlers::sign_out_handler))
                .route_layer(policy_layer(RoutePolicy::secured())),
        )
        .merge(
            Router::new()
                .route("/api/v1/auth/refresh-token", post(handlers::refresh_token_handler))
                .route_layer(policy_layer(RoutePolicy::refresh())),
        )
        .merge(
            Router::new()
                .route("/api/v1/users", get(handlers::list_users_handler))
                .route_layer(policy_layer(RoutePolicy::secured_with_roles(vec![
                    Role::Administrator,
                ]))),
        )
        .merge(
            Router::new()
                .route("/api/v1/users/me", get(handlers::me_handler))
                .route_layer(policy_layer(RoutePolicy::secured())),
        )
        .merge(
            Router::new()
                .route("/api/v1/users/identify/{identifier}", get(handlers::identify_user_handler))
                .route_layer(policy_layer(RoutePolicy::public())),
        )
        .merge(
            Router::new()
                .route("/api/v1/users/{id}", get(handlers::get_user_handler))
                .route_layer(policy_layer(RoutePolicy::public())),
        )
        .merge(
            Router::new()
                .route("/api/v1/newsletter/subscribe", post(handlers::subscribe_handler))
                .route_layer(policy_layer(RoutePolicy::public())),
        )
        .merge(
            Router::new()
                .route("/api/v1/newsletter/unsubscribe", post(handlers::unsubscribe_handler))
                .route_layer(policy_layer(RoutePolicy::public())),
        )
        .with_state(state);

    api.merge(docs::docs_router())
}
