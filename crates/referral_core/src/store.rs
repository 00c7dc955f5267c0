//! Path-based facade exposing the four ledger operations.
//!
//! # Responsibility
//! - Open one scoped connection per operation, so concurrent callers never
//!   share a SQLite handle.
//! - Wire repositories and services together for host applications.
//!
//! # Invariants
//! - The database path is persistent; in-memory and empty paths are
//!   rejected at `open`.
//! - Each operation verifies the schema once, when its connection opens.
//! - The connection is dropped on every exit path, including errors.
//! - Writers serialize through `BEGIN IMMEDIATE` plus the busy timeout;
//!   readers run concurrently under WAL.

use crate::config::{ReferralPolicy, StoreConfig};
use crate::db::open_db;
use crate::model::referral::{Referral, ReferralReceipt};
use crate::model::user::{User, UserId};
use crate::repo::error::RepoResult;
use crate::repo::referral_repo::{SqliteReferralReader, SqliteReferralRepository};
use crate::repo::user_repo::SqliteUserRepository;
use crate::service::profile_service::{ProfileService, UserReport};
use crate::service::referral_service::ReferralService;
use crate::service::user_service::UserService;
use log::info;
use rusqlite::Connection;
use std::path::Path;

/// Thread-safe entry point owning only configuration.
#[derive(Debug, Clone)]
pub struct ReferralStore {
    config: StoreConfig,
}

impl ReferralStore {
    /// Validates the config and ensures the schema at `config.db_path`.
    ///
    /// Schema failures are fatal and returned as `RepoError::Db`. Paths that
    /// SQLite treats as temporary fail with `ValidationError::TransientDbPath`.
    pub fn open(config: StoreConfig) -> RepoResult<Self> {
        config.validate()?;
        drop(open_db(&config.db_path)?);
        info!(
            "event=store_open module=store status=ok award_points={} allow_self_referral={} allow_duplicate_pairs={}",
            config.policy.award_points,
            config.policy.allow_self_referral,
            config.policy.allow_duplicate_pairs
        );
        Ok(Self { config })
    }

    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    pub fn policy(&self) -> &ReferralPolicy {
        &self.config.policy
    }

    /// Registers a user; see [`UserService::register_user`].
    pub fn register_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> RepoResult<UserId> {
        self.with_connection(|conn| {
            let service = UserService::new(SqliteUserRepository::from_verified(conn));
            service.register_user(name, email, password_hash)
        })
    }

    /// Finds a registered user by email, ignoring case.
    pub fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.with_connection(|conn| {
            UserService::new(SqliteUserRepository::from_verified(conn)).find_user_by_email(email)
        })
    }

    /// Records a referral atomically; see [`ReferralService::record_referral`].
    pub fn record_referral(
        &self,
        referrer_id: UserId,
        referred_id: UserId,
    ) -> RepoResult<ReferralReceipt> {
        let policy = self.config.policy;
        self.with_connection(|conn| {
            let repo = SqliteReferralRepository::from_verified(conn);
            let mut service = ReferralService::with_policy(repo, policy);
            service.record_referral(referrer_id, referred_id)
        })
    }

    /// Reads one user profile.
    pub fn get_user_profile(&self, user_id: UserId) -> RepoResult<User> {
        self.with_profile(|service| service.get_user_profile(user_id))
    }

    /// Lists referrals made by `user_id`, oldest first.
    ///
    /// Collected eagerly because the connection does not outlive the call.
    pub fn list_referrals_made(&self, user_id: UserId) -> RepoResult<Vec<Referral>> {
        self.with_profile(|service| service.list_referrals_made(user_id)?.collect())
    }

    /// Builds the profile plus referrals report for one user.
    pub fn track_user(&self, user_id: UserId) -> RepoResult<UserReport> {
        self.with_profile(|service| service.track_user(user_id))
    }

    fn with_profile<T>(
        &self,
        f: impl FnOnce(
            &ProfileService<SqliteUserRepository<'_>, SqliteReferralReader<'_>>,
        ) -> RepoResult<T>,
    ) -> RepoResult<T> {
        self.with_connection(|conn| {
            let conn: &Connection = conn;
            let users = SqliteUserRepository::from_verified(conn);
            let referrals = SqliteReferralReader::from_verified(conn);
            f(&ProfileService::new(users, referrals))
        })
    }

    /// `open_db` ensures and verifies the schema before `f` runs.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut conn = open_db(&self.config.db_path)?;
        f(&mut conn)
    }
}

#[cfg(test)]
mod tests {
    use super::ReferralStore;
    use crate::config::StoreConfig;
    use crate::model::user::ValidationError;
    use crate::repo::error::RepoError;

    #[test]
    fn open_rejects_invalid_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path().join("ledger.db"));
        config.policy.award_points = -1;

        let err = ReferralStore::open(config).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[test]
    fn open_rejects_in_memory_path_instead_of_losing_writes() {
        for path in [":memory:", ""] {
            let err = ReferralStore::open(StoreConfig::new(path)).unwrap_err();
            assert!(
                matches!(err, RepoError::Validation(ValidationError::TransientDbPath(_))),
                "unexpected error for {path:?}: {err}"
            );
        }
    }

    #[test]
    fn reopened_store_finds_users_by_email() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let store = ReferralStore::open(StoreConfig::new(&path)).unwrap();
            store.register_user("Filler", "f@x.com", "h").unwrap();
            store.register_user("Alice", "a@x.com", "h").unwrap();
        }

        let store = ReferralStore::open(StoreConfig::new(&path)).unwrap();
        let alice = store.find_user_by_email("A@x.com").unwrap().unwrap();
        assert_eq!(alice.id, 2);
        assert_eq!(store.get_user_profile(alice.id).unwrap(), alice);
        assert!(store.find_user_by_email("nobody@x.com").unwrap().is_none());
    }

    #[test]
    fn store_round_trips_through_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferralStore::open(StoreConfig::new(dir.path().join("ledger.db"))).unwrap();

        let alice = store.register_user("Alice", "a@x.com", "h1").unwrap();
        let bob = store.register_user("Bob", "b@x.com", "h2").unwrap();
        store.record_referral(alice, bob).unwrap();

        let report = store.track_user(alice).unwrap();
        assert_eq!(report.user.points, 10);
        assert_eq!(report.referrals.len(), 1);
        assert_eq!(report.points_from_referrals, 10);
        assert!(store.list_referrals_made(bob).unwrap().is_empty());
    }
}
