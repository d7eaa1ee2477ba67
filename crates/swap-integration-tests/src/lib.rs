//! Integration test crate for SkillSwap.
//!
//! This crate exists solely to run integration tests that span the service
//! and its domain crates. It has no public API - all functionality is in the
//! test modules.

#![forbid(unsafe_code)]
