//! # Configuration Settings
//!
//! Defines the configuration structure for the Doorman account backend.
//! Every section supports `Default` for tests and `from_env()` for the
//! server binary; `.env` loading happens in `main` via `dotenvy`.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Mail provider configuration
    #[validate(nested)]
    pub mail: MailConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load the full configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            mail: MailConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite://") {
            return Err(Error::validation("Database URL must start with 'sqlite://'"));
        }

        if self.auth.access_token_secret.len() < 32 {
            return Err(Error::validation(
                "Access token secret must be at least 32 characters long",
            ));
        }

        if self.auth.refresh_token_secret.len() < 32 {
            return Err(Error::validation(
                "Refresh token secret must be at least 32 characters long",
            ));
        }

        // Shared secrets would make the two token kinds cross-acceptable
        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(Error::validation(
                "Access and refresh token secrets must be distinct",
            ));
        }

        Ok(())
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).map(|s| s.to_lowercase() == "true" || s == "1").unwrap_or(default)
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Enable CORS
    pub enable_cors: bool,

    /// CORS allowed origins (empty = allow all)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            timeout_seconds: 30,
            enable_cors: true,
            cors_origins: vec![],
        }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Create ServerConfig from environment variables
    pub fn from_env() -> Self {
        Self {
            host: env_string("DOORMAN_HOST", "127.0.0.1"),
            port: env_parse("DOORMAN_PORT", 8080),
            timeout_seconds: env_parse("DOORMAN_TIMEOUT_SECONDS", 30),
            enable_cors: env_bool("DOORMAN_ENABLE_CORS", true),
            cors_origins: std::env::var("DOORMAN_CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/doorman.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite://")
    }

    /// Create DatabaseConfig from environment variables
    pub fn from_env() -> Self {
        Self {
            url: env_string("DATABASE_URL", "sqlite://./data/doorman.db"),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 0),
            connect_timeout_seconds: env_parse("DATABASE_CONNECT_TIMEOUT_SECONDS", 10),
            idle_timeout_seconds: env_parse("DATABASE_IDLE_TIMEOUT_SECONDS", 600),
            auto_migrate: env_bool("DATABASE_AUTO_MIGRATE", true),
        }
    }
}

/// Authentication configuration: signing secrets and token lifetimes.
///
/// Access and refresh tokens use distinct secrets so that compromise of one
/// does not compromise the other.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Secret used to sign access tokens
    #[validate(length(min = 32, message = "Access token secret must be at least 32 characters"))]
    pub access_token_secret: String,

    /// Secret used to sign refresh tokens
    #[validate(length(min = 32, message = "Refresh token secret must be at least 32 characters"))]
    pub refresh_token_secret: String,

    /// JWT issuer claim
    #[validate(length(min = 1, message = "Issuer cannot be empty"))]
    pub issuer: String,

    /// JWT audience claim
    #[validate(length(min = 1, message = "Audience cannot be empty"))]
    pub audience: String,

    /// Access token lifetime in minutes
    #[validate(range(min = 1, max = 1440, message = "Access TTL must be between 1 and 1440"))]
    pub access_token_ttl_minutes: i64,

    /// Refresh token lifetime in hours
    #[validate(range(min = 1, max = 8760, message = "Refresh TTL must be between 1 and 8760"))]
    pub refresh_token_ttl_hours: i64,

    /// Set the Secure flag on session cookies (disable only for local development)
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: "insecure-dev-access-secret-change-me!!".to_string(),
            refresh_token_secret: "insecure-dev-refresh-secret-change-me!".to_string(),
            issuer: "doorman".to_string(),
            audience: "doorman-clients".to_string(),
            access_token_ttl_minutes: 30,
            refresh_token_ttl_hours: 48,
            secure_cookies: true,
        }
    }
}

impl AuthConfig {
    /// Access token lifetime as a chrono Duration
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_ttl_minutes)
    }

    /// Refresh token lifetime as a chrono Duration
    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_token_ttl_hours)
    }

    /// Create AuthConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            access_token_secret: env_string("JWT_ACCESS_TOKEN_SECRET", &defaults.access_token_secret),
            refresh_token_secret: env_string(
                "JWT_REFRESH_TOKEN_SECRET",
                &defaults.refresh_token_secret,
            ),
            issuer: env_string("JWT_ISSUER", &defaults.issuer),
            audience: env_string("JWT_AUDIENCE", &defaults.audience),
            access_token_ttl_minutes: env_parse("JWT_ACCESS_TOKEN_TTL_MINUTES", 30),
            refresh_token_ttl_hours: env_parse("JWT_REFRESH_TOKEN_TTL_HOURS", 48),
            secure_cookies: env_bool("DOORMAN_SECURE_COOKIES", true),
        }
    }
}

/// Mail provider configuration (Mailjet-style REST API)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MailConfig {
    /// Enable outbound mail; when disabled, notification dispatch is skipped
    pub enabled: bool,

    /// Provider API base URL
    #[validate(length(min = 1, message = "Mail API base URL cannot be empty"))]
    pub api_base_url: String,

    /// Provider API key
    pub api_key: String,

    /// Provider API secret
    pub api_secret: String,

    /// Sender email address
    pub from_email: String,

    /// Sender display name
    pub from_name: String,

    /// Contact list id for the newsletter
    pub newsletter_list_id: String,

    /// Template id of the welcome message
    pub welcome_template_id: i64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: "https://api.mailjet.com".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            from_email: "no-reply@doorman.local".to_string(),
            from_name: "Doorman".to_string(),
            newsletter_list_id: String::new(),
            welcome_template_id: 0,
        }
    }
}

impl MailConfig {
    /// Create MailConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_bool("MAIL_ENABLED", false),
            api_base_url: env_string("MAIL_API_BASE_URL", &defaults.api_base_url),
            api_key: env_string("MAIL_API_KEY", ""),
            api_secret: env_string("MAIL_API_SECRET", ""),
            from_email: env_string("MAIL_FROM_EMAIL", &defaults.from_email),
            from_name: env_string("MAIL_FROM_NAME", &defaults.from_name),
            newsletter_list_id: env_string("MAIL_NEWSLETTER_LIST_ID", ""),
            welcome_template_id: env_parse("MAIL_WELCOME_TEMPLATE_ID", 0),
        }
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Service name reported in logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level filter (e.g. "info", "doorman=debug,info")
    pub log_level: String,

    /// Emit logs as JSON
    pub json_logs: bool,

    /// Enable the Prometheus metrics exporter
    pub enable_metrics: bool,

    /// Port for the Prometheus scrape endpoint
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "doorman".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            enable_metrics: false,
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    /// Create ObservabilityConfig from environment variables
    pub fn from_env() -> Self {
        Self {
            service_name: env_string("DOORMAN_SERVICE_NAME", "doorman"),
            log_level: env_string("DOORMAN_LOG_LEVEL", "info"),
            json_logs: env_bool("DOORMAN_JSON_LOGS", false),
            enable_metrics: env_bool("DOORMAN_ENABLE_METRICS", false),
            metrics_port: env_parse("DOORMAN_METRICS_PORT", 9090),
        }
    }
}
