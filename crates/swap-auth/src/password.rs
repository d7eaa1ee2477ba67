//! Password hashing.
//!
//! Passwords are hashed with Argon2id and a random salt. The plaintext lives
//! in a [`Password`] that is zeroized on drop and never printed.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AuthError, Result};

/// A plaintext password, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    /// Wraps a plaintext password.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Returns the plaintext.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the password against a minimum length.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::WeakPassword`] if it is too short.
    pub fn check_policy(&self, min_length: usize) -> Result<()> {
        if self.0.chars().count() < min_length {
            return Err(AuthError::WeakPassword {
                reason: format!("must be at least {min_length} characters"),
            });
        }
        Ok(())
    }

    /// Hashes the password with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CryptoError`] if hashing fails.
    pub fn hash(&self) -> Result<PasswordDigest> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(|e| AuthError::CryptoError {
                reason: format!("failed to hash password: {e}"),
            })?
            .to_string();
        Ok(PasswordDigest(digest))
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Password").field(&"[REDACTED]").finish()
    }
}

/// A PHC-format Argon2 hash string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Verifies a plaintext password against this digest.
    ///
    /// A malformed digest never verifies.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.0) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_str().as_bytes(), &parsed)
            .is_ok()
    }

    /// Returns the PHC string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[REDACTED]").finish()
    }
}
