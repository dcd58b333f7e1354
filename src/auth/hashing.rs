//! Password hashing and verification.
//!
//! bcrypt with work factor 10; the salt and cost are embedded in the digest
//! so verification needs no side channel. Hashing is intentionally slow
//! (tens of milliseconds) to resist brute force.

use crate::errors::{Error, Result};

/// bcrypt work factor: ~2^10 rounds per hash.
const WORK_FACTOR: u32 = 10;

/// Minimum accepted plaintext length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash a plaintext password.
///
/// Fails with a validation error when the plaintext is empty or shorter
/// than [`MIN_PASSWORD_LENGTH`].
pub fn hash_password(plaintext: &str) -> Result<String> {
    if plaintext.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation_field(
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            "password",
        ));
    }

    bcrypt::hash(plaintext, WORK_FACTOR)
        .map_err(|err| Error::internal(format!("Failed to hash password: {}", err)))
}

/// Verify a plaintext password against a stored digest.
///
/// Returns `false` on mismatch; only a malformed digest is an error.
pub fn verify_password(plaintext: &str, digest: &str) -> Result<bool> {
    bcrypt::verify(plaintext, digest)
        .map_err(|err| Error::internal(format!("Invalid password digest: {}", err)))
}
