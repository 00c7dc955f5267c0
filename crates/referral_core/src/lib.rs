//! Referral ledger core.
//! This crate is the single source of truth for user, referral and
//! referral-point invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ReferralPolicy, StoreConfig, DEFAULT_DB_FILE_NAME, DEFAULT_REFERRAL_AWARD};
pub use db::{ensure_schema, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::referral::{Referral, ReferralId, ReferralPoint, ReferralReceipt};
pub use model::user::{NewUser, User, UserId, ValidationError};
pub use repo::error::{RepoError, RepoResult};
pub use repo::referral_repo::{
    ReferralReader, ReferralRepository, ReferralStream, ReferralsMade, SqliteReferralReader,
    SqliteReferralRepository,
};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use service::profile_service::{ProfileService, UserReport};
pub use service::referral_service::ReferralService;
pub use service::user_service::UserService;
pub use store::ReferralStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
