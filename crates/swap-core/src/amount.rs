//! Credit amounts.
//!
//! Credits are whole in-platform units with no monetary value. Amounts are
//! unsigned; ledger deltas and balances are signed `i64` so admin adjustments
//! can be expressed in either direction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A non-negative number of credits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Credits(u64);

impl Credits {
    /// Zero credits.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a whole number of credits.
    #[must_use]
    pub const fn new(credits: u64) -> Self {
        Self(credits)
    }

    /// Returns the raw number of credits.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true if this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. Returns `None` on underflow.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked multiplication by a scalar. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_mul(self, rhs: u64) -> Option<Self> {
        match self.0.checked_mul(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// The amount as a signed ledger delta.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount does not fit in an `i64`.
    pub fn as_delta(self) -> Result<i64, CoreError> {
        i64::try_from(self.0)
            .map_err(|_| CoreError::InvalidAmount(format!("{} credits exceeds ledger range", self.0)))
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} credits", self.0)
    }
}

impl FromStr for Credits {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(CoreError::InvalidAmount("negative values not allowed".into()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CoreError::InvalidAmount(format!("invalid number: {s}")))
    }
}

impl From<u64> for Credits {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
