//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the User Registry, Referral Recorder
//!   and Profile Reporter use-cases.
//! - Keep host layers decoupled from storage details.

pub mod profile_service;
pub mod referral_service;
pub mod user_service;
