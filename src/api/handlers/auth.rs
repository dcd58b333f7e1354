//! Credential endpoints: sign-up, sign-in, sign-out and refresh.
//!
//! Successful credential operations set two HTTP-only cookies: a
//! short-lived access token and a long-lived refresh token. Sign-out
//! clears both and revokes the stored session token record.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::auth::models::{Account, IssuedTokens, RegistrationRequest, SignInRequest};
use crate::errors::Error;

/// JSON body plus the pair of session cookies.
pub struct SessionResponse<T> {
    status: StatusCode,
    body: T,
    cookies: Vec<Cookie<'static>>,
}

impl<T: Serialize> IntoResponse for SessionResponse<T> {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();

        for cookie in self.cookies {
            if let Ok(value) = cookie.to_string().parse() {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}

fn session_cookies(state: &ApiState, tokens: &IssuedTokens) -> Vec<Cookie<'static>> {
    let access_max_age = time::Duration::seconds(state.signer.access_ttl().num_seconds());
    let refresh_max_age = time::Duration::seconds(state.signer.refresh_ttl().num_seconds());

    vec![
        Cookie::build((ACCESS_TOKEN_COOKIE, tokens.access_token.clone()))
            .path("/")
            .http_only(true)
            .secure(state.secure_cookies)
            .same_site(SameSite::Strict)
            .max_age(access_max_age)
            .build(),
        Cookie::build((REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone()))
            .path("/")
            .http_only(true)
            .secure(state.secure_cookies)
            .same_site(SameSite::Strict)
            .max_age(refresh_max_age)
            .build(),
    ]
}

fn clearing_cookies(state: &ApiState) -> Vec<Cookie<'static>> {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .into_iter()
        .map(|name| {
            Cookie::build((name, ""))
                .path("/")
                .http_only(true)
                .secure(state.secure_cookies)
                .same_site(SameSite::Strict)
                .max_age(time::Duration::ZERO)
                .build()
        })
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Account created", body = Account,
         headers(("Set-Cookie" = String, description = "access-token and refresh-token session cookies"))),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Identifier already in use")
    ),
    tag = "auth"
)]
pub async fn sign_up_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RegistrationRequest>,
) -> Result<SessionResponse<Account>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let (account, tokens) = state.credential_service.sign_up(payload).await?;
    let cookies = session_cookies(&state, &tokens);

    Ok(SessionResponse { status: StatusCode::CREATED, body: account, cookies })
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = Account,
         headers(("Set-Cookie" = String, description = "access-token and refresh-token session cookies"))),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unknown identifier or incorrect password")
    ),
    tag = "auth"
)]
pub async fn sign_in_handler(
    State(state): State<ApiState>,
    Json(payload): Json<SignInRequest>,
) -> Result<SessionResponse<Account>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let (account, tokens) = state.credential_service.sign_in(&payload).await?;
    let cookies = session_cookies(&state, &tokens);

    Ok(SessionResponse { status: StatusCode::OK, body: account, cookies })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignOutResponse {
    pub signed_out: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-out",
    responses(
        (status = 200, description = "Session ended; cookies cleared", body = SignOutResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookieAuth" = [])),
    tag = "auth"
)]
pub async fn sign_out_handler(
    State(state): State<ApiState>,
    Extension(account): Extension<Account>,
) -> Result<SessionResponse<SignOutResponse>, ApiError> {
    state.credential_service.sign_out(&account.id).await?;

    Ok(SessionResponse {
        status: StatusCode::OK,
        body: SignOutResponse { signed_out: true },
        cookies: clearing_cookies(&state),
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    responses(
        (status = 200, description = "Both tokens re-issued", body = RefreshResponse,
         headers(("Set-Cookie" = String, description = "access-token and refresh-token session cookies"))),
        (status = 401, description = "Missing or invalid refresh token")
    ),
    security(("cookieAuth" = [])),
    tag = "auth"
)]
pub async fn refresh_token_handler(
    State(state): State<ApiState>,
    Extension(account): Extension<Account>,
) -> Result<SessionResponse<RefreshResponse>, ApiError> {
    let tokens = state.credential_service.refresh(&account).await?;
    let cookies = session_cookies(&state, &tokens);

    Ok(SessionResponse {
        status: StatusCode::OK,
        body: RefreshResponse {
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        },
        cookies,
    })
}
