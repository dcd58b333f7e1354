//! Authentication and authorization module entry point.
//!
//! Exposes the credential/session stack: password hashing, signed token
//! issuance and verification, identifier resolution, the credential
//! service and the per-route authorization guard.

pub mod account_service;
pub mod cleanup_service;
pub mod credential_service;
mod hashing;
pub mod identifier;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use account_service::AccountService;
pub use credential_service::CredentialService;
pub use hashing::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use jwt::{Claims, TokenKind, TokenSigner};
pub use middleware::{RoutePolicy, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use models::{Account, Identifier, IssuedTokens, Role, SessionToken, TokenType};
