//! Domain model for the referral ledger.
//!
//! # Responsibility
//! - Define the records shared by repositories and services.
//! - Own input validation for user registration and referral recording.
//!
//! # Invariants
//! - Identifiers are storage-assigned integers and never reused.
//! - `User::points` only grows, and only through recorded referrals.

pub mod referral;
pub mod user;
