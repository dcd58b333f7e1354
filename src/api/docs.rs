use axum::Router;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_handler,
        crate::api::handlers::auth::sign_up_handler,
        crate::api::handlers::auth::sign_in_handler,
        crate::api::handlers::auth::sign_out_handler,
        crate::api::handlers::auth::refresh_token_handler,
        crate::api::handlers::users::list_users_handler,
        crate::api::handlers::users::me_handler,
        crate::api::handlers::users::get_user_handler,
        crate::api::handlers::users::identify_user_handler,
        crate::api::handlers::newsletter::subscribe_handler,
        crate::api::handlers::newsletter::unsubscribe_handler
    ),
    components(
        schemas(
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::auth::SignOutResponse,
            crate::api::handlers::auth::RefreshResponse,
            crate::api::handlers::newsletter::SubscribeBody,
            crate::api::handlers::newsletter::UnsubscribeBody,
            crate::api::handlers::newsletter::NewsletterResponse,
            crate::auth::identifier::ResolvedIdentifier,
            crate::auth::models::Account,
            crate::auth::models::Identifier,
            crate::auth::models::Role,
            crate::auth::models::Preferences,
            crate::auth::models::NotificationPreferences,
            crate::auth::models::Connection,
            crate::auth::models::RegistrationRequest,
            crate::auth::models::RegistrationIdentifier,
            crate::auth::models::SignInRequest
        )
    ),
    tags(
        (name = "auth", description = "Credential and session lifecycle"),
        (name = "users", description = "Read-only account queries"),
        (name = "newsletter", description = "Newsletter membership"),
        (name = "health", description = "Service health")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "cookieAuth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                crate::auth::middleware::ACCESS_TOKEN_COOKIE,
            ))),
        );
    }
}

pub fn docs_router() -> Router {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()).into()
}
