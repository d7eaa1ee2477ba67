//! # swap-auth
//!
//! Identity for SkillSwap.
//!
//! This crate provides:
//!
//! - [`UserDirectory`]: accounts with an email index and cached balances
//! - [`Password`] / [`PasswordDigest`]: Argon2id hashing
//! - [`SessionStore`]: 64-character bearer tokens with a fixed 7-day expiry
//! - [`authenticate_session`]: token → [`Identity`] resolution
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use swap_auth::{NewAccount, Password, Role, SessionStore, UserDirectory, authenticate_session};
//!
//! let mut users = UserDirectory::new();
//! let mut sessions = SessionStore::new();
//! let password = Password::new("correct horse");
//! let id = users
//!     .register(
//!         &NewAccount {
//!             email: "ada@example.com",
//!             display_name: "Ada",
//!             password: &password,
//!             min_password_length: 8,
//!             role: Role::User,
//!         },
//!         Utc::now(),
//!     )
//!     .expect("register");
//!
//! let (token, _) = sessions.issue(id.clone(), Utc::now(), Duration::days(7));
//! let identity = authenticate_session(&users, &sessions, token.as_str(), Utc::now()).expect("valid");
//! assert_eq!(identity.user_id, id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod directory;
pub mod error;
pub mod password;
pub mod session;
pub mod types;

pub use directory::{NewAccount, UserDirectory, authenticate_session};
pub use error::{AuthError, Result};
pub use password::{Password, PasswordDigest};
pub use session::{DEFAULT_SESSION_TTL_HOURS, Session, SessionStore, SessionToken, TokenHash};
pub use types::{Identity, Role, User, UserProfile, UserStatus};
