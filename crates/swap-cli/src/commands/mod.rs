//! CLI command implementations.
//!
//! Each submodule implements one command group:
//! - [`auth`] - Registration, sessions and profiles
//! - [`skill`] - Skill listings
//! - [`request`] - Service requests
//! - [`matching`] - Provider suggestions
//! - [`negotiate`] - Proposals on accepted matches
//! - [`tx`] - Transactions and disputes
//! - [`feedback`] - Ratings, reputation and notifications
//! - [`credits`] - Balance and history
//! - [`admin`] - Administrator operations

pub mod admin;
pub mod auth;
pub mod credits;
pub mod feedback;
pub mod matching;
pub mod negotiate;
pub mod request;
pub mod skill;
pub mod tx;

pub use admin::AdminCommand;
pub use auth::AuthCommand;
pub use credits::CreditsCommand;
pub use feedback::{NotifyCommand, RateCommand, ReputationCommand};
pub use matching::MatchCommand;
pub use negotiate::NegotiateCommand;
pub use request::RequestCommand;
pub use skill::SkillCommand;
pub use tx::TxCommand;
