//! # Doorman
//!
//! Doorman is a user-account and session backend: it registers accounts,
//! authenticates them with email/phone/username identifiers, issues and
//! rotates signed access/refresh credentials, enforces role-based access
//! and triggers transactional mail side-effects.
//!
//! ## Architecture
//!
//! The system follows a layered architecture pattern:
//!
//! ```text
//! HTTP API Layer → Credential/Account Services → Persistence Layer
//!      ↓                      ↓                        ↓
//! Authorization Guard   Token Signer/Store      Observability Stack
//! ```
//!
//! ## Core Components
//!
//! - **HTTP API**: Axum-based server for the credential and account endpoints
//! - **Credential Service**: sign-up, sign-in, sign-out and refresh orchestration
//! - **Token Signer**: access/refresh JWTs with distinct secrets and lifetimes
//! - **Persistence Layer**: SQLx over SQLite for accounts and session tokens
//! - **Notifications**: Mailjet-style provider for welcome/newsletter mail

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notifications;
pub mod observability;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use observability::init_observability;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
