//! Core account types.
//!
//! This module defines:
//! - [`Role`]: what a user may do (`user` or `admin`)
//! - [`UserStatus`]: whether the account may sign in
//! - [`User`]: the account document, including the cached credit balance
//! - [`Identity`]: what a valid session resolves to

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use swap_core::UserId;

use crate::error::{AuthError, Result};
use crate::password::PasswordDigest;

/// Loose email shape check: one `@`, no whitespace, a dot in the domain.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|_| unreachable!())
});

/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 64;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular marketplace participant.
    #[default]
    User,
    /// Moderator with dispute and account powers.
    Admin,
}

impl Role {
    /// Returns true for the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(AuthError::InvalidRole {
                value: s.to_string(),
            }),
        }
    }
}

/// Whether an account may authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Normal account.
    #[default]
    Active,
    /// Blocked by an administrator.
    Suspended,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Normalized (trimmed, lowercase) email.
    pub email: String,
    /// Name shown to other users.
    pub display_name: String,
    /// Argon2 hash of the password.
    pub password_hash: PasswordDigest,
    /// Cached credit balance; mirrors the last ledger `balance_after`.
    pub credits: i64,
    /// Account role.
    pub role: Role,
    /// Account status.
    pub status: UserStatus,
    /// Optional profile text.
    pub bio: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true if the account may sign in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// The public view of this account, without the credential hash.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            credits: self.credits,
            role: self.role,
            status: self.status,
            bio: self.bio.clone(),
            created_at: self.created_at,
        }
    }
}

/// An account without its credential hash, safe to return to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique identifier.
    pub id: UserId,
    /// Name shown to other users.
    pub display_name: String,
    /// Normalized email.
    pub email: String,
    /// Cached credit balance.
    pub credits: i64,
    /// Account role.
    pub role: Role,
    /// Account status.
    pub status: UserStatus,
    /// Optional profile text.
    pub bio: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// The caller behind a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The authenticated user.
    pub user_id: UserId,
    /// Their role at resolution time.
    pub role: Role,
}

impl Identity {
    /// Fails unless this identity is an administrator.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PermissionDenied`] for non-admins.
    pub fn require_admin(&self) -> Result<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                reason: "admin role required".to_string(),
            })
        }
    }
}

/// Normalizes and validates an email address.
///
/// # Errors
///
/// Returns [`AuthError::InvalidEmail`] if the address is malformed.
pub fn normalize_email(email: &str) -> Result<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(AuthError::InvalidEmail {
            reason: "email cannot be empty".to_string(),
        });
    }
    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(AuthError::InvalidEmail {
            reason: format!("malformed address: {normalized}"),
        });
    }
    Ok(normalized)
}

/// Trims and validates a display name.
///
/// # Errors
///
/// Returns [`AuthError::InvalidDisplayName`] if the name is empty or too long.
pub fn normalize_display_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidDisplayName {
            reason: "name cannot be empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(AuthError::InvalidDisplayName {
            reason: format!("name exceeds {MAX_DISPLAY_NAME_LEN} characters"),
        });
    }
    Ok(trimmed.to_string())
}
