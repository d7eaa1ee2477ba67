//! # swap-ledger
//!
//! Credit accounting for SkillSwap.
//!
//! Every balance change appends an immutable [`CreditEntry`] recording the
//! signed amount and the balance after it. A user's balance is, by
//! construction, the running sum of their entries; the cached balance on the
//! account document is patched from [`CreditEntry::balance_after`] and can be
//! checked with [`Ledger::verify`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod ledger;

pub use entry::{CreditEntry, Direction, EntryType, Posting};
pub use error::{LedgerError, Result};
pub use ledger::{Discrepancy, Ledger};
