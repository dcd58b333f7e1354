//! Account and session domain models.
//!
//! Defines the core account entity, its identifier set, session token
//! records and the request/response DTOs used by the credential endpoints.
//! The account struct deliberately carries no password digest; hashes only
//! travel through `NewAccount` and repository-internal tuples so no
//! serialized view can ever leak them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::auth::identifier;
use crate::domain::{AccountId, SessionTokenId};

/// Account role for role-based access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Administrator => "administrator",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "administrator" => Ok(Role::Administrator),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Error returned when role parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Kind of persisted session token.
///
/// Only access-token tracking exists today; the enum leaves room for other
/// kinds without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    Authentication,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Authentication => "authentication",
        }
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = TokenTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authentication" => Ok(TokenType::Authentication),
            other => Err(TokenTypeParseError(other.to_string())),
        }
    }
}

/// Error returned when token type parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid token type: {0}")]
pub struct TokenTypeParseError(pub String);

/// Login handles of an account. `username` is always present and unique;
/// `email` and `phone_number` are optional but unique when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub username: String,
}

/// Normalize an email for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Per-account notification toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email_newsletter: bool,
    pub email_message: bool,
    pub push_message: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self { email_newsletter: true, email_message: true, push_message: true }
    }
}

/// Account preferences, stored as a JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub language: String,
    pub currency: String,
    pub notifications: NotificationPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "fr".to_string(),
            currency: "EUR".to_string(),
            notifications: NotificationPreferences::default(),
        }
    }
}

/// A device/client connection recorded against the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored representation of a registered account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub identifier: Identifier,
    pub role: Role,
    pub preferences: Preferences,
    pub connections: Vec<Connection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The most stable identifier of the account: email when present,
    /// falling back to the phone number. Carried in refresh-token claims so
    /// re-identification needs no database round-trip.
    pub fn stable_identifier(&self) -> Option<&str> {
        self.identifier
            .email
            .as_deref()
            .or(self.identifier.phone_number.as_deref())
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// New account creation payload (password already hashed).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: AccountId,
    pub identifier: Identifier,
    pub password_hash: String,
    pub role: Role,
    pub preferences: Preferences,
}

/// Persisted record binding a signed token value to an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub id: SessionTokenId,
    pub account_id: AccountId,
    pub token_type: TokenType,
    pub value: String,
    pub created_at: DateTime<Utc>,
    /// Store-level expiry; when absent the signed token's embedded expiry
    /// is authoritative.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Identifier payload of a registration request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationIdentifier {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: Option<String>,
    #[validate(
        length(min = 3, max = 20, message = "Username must be 3 to 20 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
}

impl From<RegistrationIdentifier> for Identifier {
    fn from(value: RegistrationIdentifier) -> Self {
        Identifier {
            email: value.email.map(|e| normalize_email(&e)),
            phone_number: value.phone_number,
            username: value.username,
        }
    }
}

/// Request to register a new account.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[validate(nested)]
    pub identifier: RegistrationIdentifier,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Request to sign in with any identifier kind and a password.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[validate(length(min = 1, message = "Identifier cannot be empty"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Both signed tokens issued by a successful credential operation.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    if identifier::is_phone_number(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_number"))
    }
}

fn validate_username(value: &str) -> Result<(), ValidationError> {
    if identifier::is_username(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with(email: Option<&str>, phone: Option<&str>) -> Account {
        Account {
            id: AccountId::new(),
            identifier: Identifier {
                email: email.map(str::to_string),
                phone_number: phone.map(str::to_string),
                username: "johndoe".to_string(),
            },
            role: Role::default(),
            preferences: Preferences::default(),
            connections: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn role_round_trip() {
        for (input, expected) in [("user", Role::User), ("administrator", Role::Administrator)] {
            let parsed = input.parse::<Role>().unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.to_string(), input);
        }

        let err = "moderator".parse::<Role>().unwrap_err();
        assert_eq!(err.0, "moderator");
    }

    #[test]
    fn token_type_round_trip() {
        let parsed = "authentication".parse::<TokenType>().unwrap();
        assert_eq!(parsed, TokenType::Authentication);
        assert_eq!(parsed.to_string(), "authentication");
        assert!("password-reset".parse::<TokenType>().is_err());
    }

    #[test]
    fn stable_identifier_prefers_email() {
        let account = account_with(Some("john@x.com"), Some("+33615856245"));
        assert_eq!(account.stable_identifier(), Some("john@x.com"));

        let phone_only = account_with(None, Some("+33615856245"));
        assert_eq!(phone_only.stable_identifier(), Some("+33615856245"));

        let username_only = account_with(None, None);
        assert_eq!(username_only.stable_identifier(), None);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
        assert!(!account_with(None, None).is_administrator());
    }

    #[test]
    fn default_preferences_match_product_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.language, "fr");
        assert_eq!(prefs.currency, "EUR");
        assert!(prefs.notifications.email_newsletter);
        assert!(prefs.notifications.email_message);
        assert!(prefs.notifications.push_message);
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("Test@Example.COM"), "test@example.com");
        assert_eq!(normalize_email("  user@HOST.com  "), "user@host.com");
    }

    #[test]
    fn account_serialization_never_contains_password() {
        let account = account_with(Some("john@x.com"), None);
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("\"username\":\"johndoe\""));
    }

    #[test]
    fn registration_request_validation() {
        let valid = RegistrationRequest {
            identifier: RegistrationIdentifier {
                email: Some("john@x.com".to_string()),
                phone_number: None,
                username: "johndoe".to_string(),
            },
            password: "Abc12345678".to_string(),
        };
        assert!(valid.validate().is_ok());

        let short_password = RegistrationRequest { password: "abc".to_string(), ..valid.clone() };
        assert!(short_password.validate().is_err());

        let bad_email = RegistrationRequest {
            identifier: RegistrationIdentifier {
                email: Some("not-an-email".to_string()),
                ..valid.identifier.clone()
            },
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let bad_username = RegistrationRequest {
            identifier: RegistrationIdentifier {
                username: "bad!!name".to_string(),
                ..valid.identifier.clone()
            },
            ..valid
        };
        assert!(bad_username.validate().is_err());
    }

    #[test]
    fn registration_identifier_normalizes_email_on_conversion() {
        let identifier: Identifier = RegistrationIdentifier {
            email: Some("John@X.COM".to_string()),
            phone_number: None,
            username: "johndoe".to_string(),
        }
        .into();
        assert_eq!(identifier.email.as_deref(), Some("john@x.com"));
    }
}
