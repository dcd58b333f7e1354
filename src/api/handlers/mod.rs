//! HTTP request handlers.

pub mod auth;
pub mod health;
pub mod newsletter;
pub mod users;

pub use auth::{refresh_token_handler, sign_in_handler, sign_out_handler, sign_up_handler};
pub use health::health_handler;
pub use newsletter::{subscribe_handler, unsubscribe_handler};
pub use users::{get_user_handler, identify_user_handler, list_users_handler, me_handler};
