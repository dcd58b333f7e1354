//! Axum middleware for authentication and authorization.
//!
//! Authentication and role enforcement run as one combined stage driven by
//! a per-route [`RoutePolicy`] attached at route-registration time. Role
//! requirements imply authentication by construction, so a role check can
//! never run without a resolved account. Routes are registered
//! default-closed: every route declares its policy and the public ones are
//! the explicit exceptions.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{field, info_span, warn};

use crate::api::error::ApiError;
use crate::auth::jwt::{TokenKind, TokenSigner};
use crate::auth::models::Role;
use crate::domain::AccountId;
use crate::errors::{AuthErrorType, Error};
use crate::storage::repositories::AccountRepository;

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access-token";

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh-token";

/// Per-route access requirements, fixed at registration time.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    requires_auth: bool,
    required_roles: Vec<Role>,
    token_kind: TokenKind,
}

impl RoutePolicy {
    /// No authentication; the explicit exception under default-closed routing.
    pub fn public() -> Self {
        Self { requires_auth: false, required_roles: vec![], token_kind: TokenKind::Access }
    }

    /// Requires a valid access token.
    pub fn secured() -> Self {
        Self { requires_auth: true, required_roles: vec![], token_kind: TokenKind::Access }
    }

    /// Requires a valid access token and membership in one of the roles.
    pub fn secured_with_roles(roles: impl Into<Vec<Role>>) -> Self {
        Self { requires_auth: true, required_roles: roles.into(), token_kind: TokenKind::Access }
    }

    /// Requires a valid refresh token presented via the refresh cookie.
    pub fn refresh() -> Self {
        Self { requires_auth: true, required_roles: vec![], token_kind: TokenKind::Refresh }
    }
}

/// State handed to the guard middleware for one route group.
pub struct RouteGuard {
    signer: Arc<TokenSigner>,
    account_repository: Arc<dyn AccountRepository>,
    policy: RoutePolicy,
}

impl RouteGuard {
    pub fn new(
        signer: Arc<TokenSigner>,
        account_repository: Arc<dyn AccountRepository>,
        policy: RoutePolicy,
    ) -> Self {
        Self { signer, account_repository, policy }
    }
}

pub type GuardState = Arc<RouteGuard>;

/// Middleware entry point enforcing the route's [`RoutePolicy`].
///
/// On success the resolved [`Account`](crate::auth::models::Account) is
/// attached to request extensions for handlers and the role check.
pub async fn require_access(
    State(guard): State<GuardState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS || !guard.policy.requires_auth {
        return Ok(next.run(request).await);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let correlation_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "auth_guard.require_access",
        http.method = %method,
        http.path = %path,
        auth.account_id = field::Empty,
        correlation_id = %correlation_id
    );
    let _guard = span.enter();

    let token = extract_token(&request, guard.policy.token_kind).ok_or_else(|| {
        warn!(%correlation_id, kind = %guard.policy.token_kind, "request carried no credential");
        ApiError::from(Error::auth(
            format!("Missing {} token", guard.policy.token_kind),
            AuthErrorType::MissingToken,
        ))
    })?;

    let claims = guard.signer.verify(&token, guard.policy.token_kind).map_err(|err| {
        warn!(%correlation_id, error = %err, "token verification failed");
        ApiError::from(err)
    })?;

    let account_id = AccountId::from_string(claims.sub);
    let account = guard
        .account_repository
        .get_account(&account_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            warn!(%correlation_id, account_id = %account_id, "token subject no longer exists");
            ApiError::from(Error::auth(
                "Account no longer exists",
                AuthErrorType::InvalidToken,
            ))
        })?;

    tracing::Span::current().record("auth.account_id", field::display(&account.id));

    if !guard.policy.required_roles.is_empty()
        && !guard.policy.required_roles.contains(&account.role)
    {
        warn!(
            %correlation_id,
            account_id = %account.id,
            role = %account.role,
            "role check failed"
        );
        return Err(ApiError::from(Error::auth(
            "Restricted access",
            AuthErrorType::InsufficientRole,
        )));
    }

    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}

fn extract_token(request: &Request<Body>, kind: TokenKind) -> Option<String> {
    match kind {
        TokenKind::Access => bearer_token(request).or_else(|| cookie_token(request, ACCESS_TOKEN_COOKIE)),
        // Refresh tokens are only ever accepted from the HTTP-only cookie
        TokenKind::Refresh => cookie_token(request, REFRESH_TOKEN_COOKIE),
    }
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(str::to_string)
}

fn cookie_token(request: &Request<Body>, name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(request.headers());
    jar.get(name).map(|cookie| cookie.value().to_string())
}
