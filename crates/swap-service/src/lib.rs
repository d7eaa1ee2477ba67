//! # swap-service
//!
//! The SkillSwap service: every user-facing operation behind one facade.
//!
//! This crate provides:
//! - [`SkillSwap`], which owns the [`Database`] behind a lock, authenticates
//!   callers by session token, and snapshots state to disk after each
//!   successful mutation
//! - Account, marketplace, settlement, feedback and administrator operations
//!   as methods on [`SkillSwap`]
//! - [`ServiceConfig`] loaded from `config.json` in the state directory
//! - [`Outcome`], the `{success, data, error}` envelope for callers that
//!   speak JSON
//!
//! ## Example
//!
//! ```
//! use swap_service::SkillSwap;
//!
//! let service = SkillSwap::in_memory();
//! let session = service.register("ada@example.com", "Ada", "password123")?;
//! assert_eq!(service.balance(session.token.as_str())?.credits, 100);
//! # Ok::<(), swap_service::ServiceError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod admin;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod facade;
pub mod feedback;
pub mod marketplace;
pub mod outcome;
pub mod settlement;

pub use account::{AuthSession, Balance};
pub use admin::SweepReport;
pub use clock::Clock;
pub use config::ServiceConfig;
pub use database::Database;
pub use error::{Result, ServiceError};
pub use facade::SkillSwap;
pub use marketplace::NegotiationOutcome;
pub use outcome::{Outcome, OutcomeError};
