//! User Registry use-case service.
//!
//! # Invariants
//! - New users always start with a zero balance.
//! - Emails and password hashes never reach the logs.

use crate::model::user::{NewUser, User, UserId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::user_repo::UserRepository;
use log::{info, warn};

/// Use-case service for registering and reading users.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a user and returns the storage-assigned id.
    ///
    /// `password_hash` is stored verbatim; hashing is the caller's job.
    ///
    /// # Errors
    /// - `RepoError::Validation` for empty or malformed input.
    /// - `RepoError::DuplicateEmail` when the email is taken.
    /// - `RepoError::Db` for any other engine failure.
    pub fn register_user(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> RepoResult<UserId> {
        let user = NewUser::new(name, email, password_hash);
        match self.repo.create_user(&user) {
            Ok(user_id) => {
                info!("event=user_register module=service status=ok user_id={user_id}");
                Ok(user_id)
            }
            Err(err) => {
                warn!(
                    "event=user_register module=service status=error error_code={}",
                    error_code(&err)
                );
                Err(err)
            }
        }
    }

    /// Reads one user; missing ids are `RepoError::NotFound`.
    pub fn get_user_profile(&self, user_id: UserId) -> RepoResult<User> {
        self.repo
            .get_user(user_id)?
            .ok_or(RepoError::NotFound(user_id))
    }

    /// Looks a user up by email; `None` when nobody registered it.
    pub fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.repo.find_user_by_email(email)
    }
}

/// Stable short code for log lines.
pub(crate) fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::Validation(_) => "validation",
        RepoError::DuplicateEmail(_) => "duplicate_email",
        RepoError::UnknownUser(_) => "unknown_user",
        RepoError::NotFound(_) => "not_found",
        RepoError::DuplicateReferral { .. } => "duplicate_referral",
        RepoError::Db(err) if err.is_schema_error() => "schema",
        RepoError::Db(_) => "storage",
        RepoError::InvalidData(_) => "invalid_data",
    }
}
