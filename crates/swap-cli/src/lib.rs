//! # swap-cli
//!
//! SkillSwap command-line interface.
//!
//! Provides commands for:
//! - Registration, login and profiles
//! - Skills, service requests and provider matching
//! - Negotiation, transactions and disputes
//! - Ratings, notifications and credit history
//! - Administrator operations
//!
//! # Architecture
//!
//! The CLI opens a [`swap_service::SkillSwap`] directly on the state
//! directory given by `--state-dir`. The token returned by `auth login` is
//! saved next to the state so later invocations act as the same user.
//!
//! ```text
//! ┌───────────┐   method calls   ┌──────────────┐   snapshot   ┌─────────────┐
//! │ swap-cli  │─────────────────►│ swap-service │─────────────►│ state dir   │
//! └───────────┘                  └──────────────┘              └─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use context::Context;
pub use error::CliError;
pub use output::OutputFormat;
