//! Identifier classification and resolution.
//!
//! A raw login string may be an email address, a phone number or a
//! username. Classification is pattern-based with an explicit first-match
//! priority: phone number, then email, then username. Resolution looks the
//! raw string up across all identifier columns and returns a partial
//! identifier that never exposes fields the caller did not supply.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::errors::Result;
use crate::storage::repositories::AccountRepository;

static PHONE_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\+]?[\(]?[0-9]{3}[\)]?[-\s\.]?[0-9]{3}[-\s\.]?[0-9]{4,6}$")
        .expect("PHONE_NUMBER_REGEX should be a valid regex pattern")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w\-\.]+@([\w-]+\.)+[\w-]{2,4}$")
        .expect("EMAIL_REGEX should be a valid regex pattern")
});

static USERNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]+([_ -]?[a-zA-Z0-9])*$")
        .expect("USERNAME_REGEX should be a valid regex pattern")
});

/// Which kind of login handle a raw string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentifierKind {
    Email,
    PhoneNumber,
    Username,
}

pub fn is_phone_number(value: &str) -> bool {
    PHONE_NUMBER_REGEX.is_match(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

pub fn is_username(value: &str) -> bool {
    USERNAME_REGEX.is_match(value)
}

/// Classify a raw identifier string.
///
/// Priority is fixed: phone number, then email, then username; the first
/// matching pattern wins. An all-digit string therefore classifies as a
/// phone number even though the username pattern would also accept it.
pub fn classify(raw: &str) -> Option<IdentifierKind> {
    if is_phone_number(raw) {
        Some(IdentifierKind::PhoneNumber)
    } else if is_email(raw) {
        Some(IdentifierKind::Email)
    } else if is_username(raw) {
        Some(IdentifierKind::Username)
    } else {
        None
    }
}

/// Partial identifier returned by resolution: the account's username plus
/// whichever of email/phone equals the raw input. Unmatched fields stay
/// `None` so resolving by phone never leaks the account's email and vice
/// versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIdentifier {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Resolves raw login strings to canonical identifier sets.
#[derive(Clone)]
pub struct IdentifierResolver {
    account_repository: Arc<dyn AccountRepository>,
}

impl IdentifierResolver {
    pub fn new(account_repository: Arc<dyn AccountRepository>) -> Self {
        Self { account_repository }
    }

    /// Look up any account whose email, phone number or username equals the
    /// raw input. `None` is the normal "identifier not found" outcome, not
    /// an error.
    #[instrument(skip(self), fields(identifier = %raw))]
    pub async fn resolve(&self, raw: &str) -> Result<Option<ResolvedIdentifier>> {
        let matches = self.account_repository.find_by_identifier(raw).await?;

        let account = match matches.first() {
            Some(account) => account,
            None => return Ok(None),
        };

        if matches.len() > 1 {
            // Should be impossible under the uniqueness indexes; take the
            // oldest match deterministically and flag the integrity issue.
            warn!(
                identifier = %raw,
                matches = matches.len(),
                "identifier matched multiple accounts"
            );
        }

        let mut resolved = ResolvedIdentifier {
            username: account.identifier.username.clone(),
            email: None,
            phone_number: None,
        };

        if account.identifier.email.as_deref() == Some(raw) {
            resolved.email = Some(raw.to_string());
        }
        if account.identifier.phone_number.as_deref() == Some(raw) {
            resolved.phone_number = Some(raw.to_string());
        }

        Ok(Some(resolved))
    }
}
