//! Typed identifiers.
//!
//! Every document kind gets its own newtype so a request id can never be
//! handed to an operation expecting a transaction id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Creates an identifier from an existing string.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is empty or contains whitespace.
            pub fn from_string(id: impl Into<String>) -> Result<Self, CoreError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(CoreError::InvalidId(format!(
                        "{} cannot be empty",
                        stringify!($name)
                    )));
                }
                if id.chars().any(char::is_whitespace) {
                    return Err(CoreError::InvalidId(format!(
                        "{} cannot contain whitespace: {id:?}",
                        stringify!($name)
                    )));
                }
                Ok(Self(id))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifies a registered user.
    UserId
);
define_id!(
    /// Identifies a listed skill.
    SkillId
);
define_id!(
    /// Identifies a service request.
    RequestId
);
define_id!(
    /// Identifies a suggested match between a request and a provider.
    MatchId
);
define_id!(
    /// Identifies a proposed change of exchange terms.
    NegotiationId
);
define_id!(
    /// Identifies a binding transaction.
    TransactionId
);
define_id!(
    /// Identifies a rating.
    RatingId
);
define_id!(
    /// Identifies a notification.
    NotificationId
);
define_id!(
    /// Identifies a credit history entry.
    EntryId
);
define_id!(
    /// Opaque blob-storage reference for portfolio items and dispute evidence.
    AttachmentId
);
