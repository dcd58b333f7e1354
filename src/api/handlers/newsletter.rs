//! Newsletter subscription endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::errors::Error;
use crate::notifications::NotificationService;

fn notification_service(state: &ApiState) -> Result<Arc<NotificationService>, ApiError> {
    state
        .notification_service
        .as_ref()
        .cloned()
        .ok_or_else(|| ApiError::service_unavailable("Mail provider is disabled"))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeBody {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterResponse {
    pub subscribed: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/newsletter/subscribe",
    request_body = SubscribeBody,
    responses(
        (status = 200, description = "Subscribed", body = NewsletterResponse),
        (status = 400, description = "Invalid email"),
        (status = 502, description = "Mail provider failure"),
        (status = 503, description = "Mail provider disabled")
    ),
    tag = "newsletter"
)]
pub async fn subscribe_handler(
    State(state): State<ApiState>,
    Json(payload): Json<SubscribeBody>,
) -> Result<(StatusCode, Json<NewsletterResponse>), ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let service = notification_service(&state)?;
    service.subscribe_to_newsletter(&payload.email).await?;

    Ok((StatusCode::OK, Json(NewsletterResponse { subscribed: true })))
}

#[utoipa::path(
    post,
    path = "/api/v1/newsletter/unsubscribe",
    request_body = UnsubscribeBody,
    responses(
        (status = 200, description = "Unsubscribed", body = NewsletterResponse),
        (status = 400, description = "Invalid email or unknown contact"),
        (status = 502, description = "Mail provider failure"),
        (status = 503, description = "Mail provider disabled")
    ),
    tag = "newsletter"
)]
pub async fn unsubscribe_handler(
    State(state): State<ApiState>,
    Json(payload): Json<UnsubscribeBody>,
) -> Result<(StatusCode, Json<NewsletterResponse>), ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let service = notification_service(&state)?;
    service
        .unsubscribe_from_newsletter(&payload.email, payload.reason.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(NewsletterResponse { subscribed: false })))
}
