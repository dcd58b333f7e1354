//! Read-only account endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::identifier::ResolvedIdentifier;
use crate::auth::models::Account;
use crate::domain::AccountId;

#[derive(Debug, Clone, Deserialize, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListAccountsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Accounts list", body = [Account]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an administrator")
    ),
    security(("cookieAuth" = [])),
    tag = "users"
)]
pub async fn list_users_handler(
    State(state): State<ApiState>,
    Query(params): Query<ListAccountsQuery>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);

    let accounts = state.account_service.list_accounts(limit, offset).await?;
    Ok(Json(accounts))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "The authenticated account", body = Account),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookieAuth" = [])),
    tag = "users"
)]
pub async fn me_handler(Extension(account): Extension<Account>) -> Json<Account> {
    Json(account)
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "Account identifier")),
    responses(
        (status = 200, description = "Account details", body = Account),
        (status = 404, description = "Account not found")
    ),
    tag = "users"
)]
pub async fn get_user_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let account_id = AccountId::from_string(id.clone());

    let account = state
        .account_service
        .get_account(&account_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account '{}' not found", id)))?;

    Ok(Json(account))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/identify/{identifier}",
    params(("identifier" = String, Path, description = "Email, phone number or username")),
    responses(
        (status = 200, description = "Partial canonical identifier", body = ResolvedIdentifier),
        (status = 404, description = "No account matches the identifier")
    ),
    tag = "users"
)]
pub async fn identify_user_handler(
    State(state): State<ApiState>,
    Path(identifier): Path<String>,
) -> Result<Json<ResolvedIdentifier>, ApiError> {
    let resolved = state
        .account_service
        .identify(&identifier)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(resolved))
}
