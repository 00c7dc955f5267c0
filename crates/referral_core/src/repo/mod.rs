//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Translate engine constraint failures into semantic errors.
//!
//! # Invariants
//! - Every caller-supplied value is bound as a statement parameter.
//! - Multi-statement writes run inside one transaction.
//! - Repositories are only constructed over a verified schema.

pub mod error;
pub mod referral_repo;
pub mod user_repo;
