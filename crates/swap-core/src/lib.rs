//! # swap-core
//!
//! Primitives shared by every SkillSwap crate.
//!
//! This crate provides:
//!
//! - Typed identifiers ([`UserId`], [`TransactionId`], ...)
//! - [`Credits`], the whole-number amount exchanged for services

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod error;
pub mod ids;

pub use amount::Credits;
pub use error::CoreError;
pub use ids::{
    AttachmentId, EntryId, MatchId, NegotiationId, NotificationId, RatingId, RequestId, SkillId,
    TransactionId, UserId,
};
