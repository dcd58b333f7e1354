//! Signed access and refresh token management.
//!
//! Access and refresh tokens are signed with distinct secrets and carry
//! distinct expiry windows, so compromise of one kind never compromises
//! the other and the two kinds can never be cross-accepted. Claims carry
//! the account id as `sub`; refresh tokens additionally carry the
//! account's most stable identifier as `user` for re-identification
//! without a database round-trip.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::config::AuthConfig;
use crate::errors::{AuthErrorType, Error, Result};
use crate::observability::metrics;

/// Which signing secret and expiry window a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the account id
    pub sub: String,
    /// Account id for access tokens; most stable identifier for refresh tokens
    pub user: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

/// Service issuing and verifying the two signed token kinds.
pub struct TokenSigner {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenSigner {
    /// Create a signer from the authentication configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: config.access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
        }
    }

    /// Lifetime of newly issued access tokens.
    pub fn access_ttl(&self) -> chrono::Duration {
        self.access_ttl
    }

    /// Lifetime of newly issued refresh tokens.
    pub fn refresh_ttl(&self) -> chrono::Duration {
        self.refresh_ttl
    }

    /// Issue a short-lived access token for the account.
    pub fn issue_access_token(&self, account_id: &str) -> Result<String> {
        let token = self.sign(account_id, account_id, TokenKind::Access)?;
        metrics::record_token_issued("access");
        Ok(token)
    }

    /// Issue a long-lived refresh token carrying the account's most stable
    /// identifier as the `user` claim.
    pub fn issue_refresh_token(&self, account_id: &str, stable_identifier: &str) -> Result<String> {
        let token = self.sign(account_id, stable_identifier, TokenKind::Refresh)?;
        metrics::record_token_issued("refresh");
        Ok(token)
    }

    /// Verify a token against the secret and claim shape of the expected
    /// kind. Bad signature, wrong issuer/audience and past expiry are all
    /// client-facing authentication failures.
    pub fn verify(&self, token: &str, expected_kind: TokenKind) -> Result<Claims> {
        let decoding_key = match expected_kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let token_data =
            decode::<Claims>(token, decoding_key, &self.validation).map_err(|err| {
                match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::auth(
                        format!("{} token has expired", expected_kind),
                        AuthErrorType::ExpiredToken,
                    ),
                    _ => Error::auth(
                        format!("Invalid {} token", expected_kind),
                        AuthErrorType::InvalidToken,
                    ),
                }
            })?;

        Ok(token_data.claims)
    }

    fn sign(&self, account_id: &str, user: &str, kind: TokenKind) -> Result<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: account_id.to_string(),
            user: user.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let encoding_key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        encode(&Header::default(), &claims, encoding_key)
            .map_err(|err| Error::internal(format!("Failed to sign {} token: {}", kind, err)))
    }
}
