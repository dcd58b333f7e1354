//! Configuration loading and validation.

mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, MailConfig, ObservabilityConfig, ServerConfig,
};
