//! # swap-market
//!
//! The SkillSwap marketplace state machines.
//!
//! This crate provides:
//!
//! - [`SkillCatalog`]: skills users offer, with level and hourly rate
//! - [`RequestBoard`]: service requests and their exchange terms
//! - [`MatchBook`]: scored provider suggestions for a request
//! - [`NegotiationBook`]: counter-proposals on accepted matches
//! - [`TransactionBook`]: binding exchanges with dual confirmation
//! - [`RatingBook`]: post-completion ratings and per-role reputation
//! - [`Inbox`]: per-user notifications
//!
//! Every type here is plain data plus validation. Nothing touches credits;
//! the caller settles against the ledger when a transaction completes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod matching;
pub mod negotiation;
pub mod notification;
pub mod rating;
pub mod request;
pub mod skill;
pub mod transaction;

pub use error::{MarketError, Result};
pub use matching::{AcceptedMatch, MatchBook, MatchStatus, SuggestedMatch, match_score};
pub use negotiation::{
    DEFAULT_NEGOTIATION_TTL_HOURS, Negotiation, NegotiationBook, NegotiationStatus, Proposal,
};
pub use notification::{Inbox, Notification, NotificationKind};
pub use rating::{RatedRole, Rating, RatingBook, RatingScore, Reputation, RoleReputation};
pub use request::{ExchangeMode, ExchangeTerms, NewRequest, RequestBoard, RequestStatus, ServiceRequest};
pub use skill::{NewSkill, Skill, SkillCatalog, SkillLevel, normalize_category};
pub use transaction::{
    Dispute, Party, Resolution, Transaction, TransactionBook, TransactionStatus,
};
