//! Repository error taxonomy.

use crate::db::DbError;
use crate::model::user::{UserId, ValidationError};
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Semantic and transport errors surfaced by repositories and services.
#[derive(Debug)]
pub enum RepoError {
    /// Empty or malformed input; caller-fixable.
    Validation(ValidationError),
    /// Another user already owns this email.
    DuplicateEmail(String),
    /// A referral named a user id that does not exist.
    UnknownUser(UserId),
    /// A read targeted a user id that does not exist.
    NotFound(UserId),
    /// The policy forbids recording this pair again.
    DuplicateReferral {
        referrer_id: UserId,
        referred_id: UserId,
    },
    /// Storage engine failure; any enclosing transaction was rolled back.
    Db(DbError),
    /// A persisted row violates a ledger invariant.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            Self::UnknownUser(id) => write!(f, "unknown user: {id}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::DuplicateReferral {
                referrer_id,
                referred_id,
            } => write!(
                f,
                "referral {referrer_id} -> {referred_id} is already recorded"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns the extended SQLite result code when `err` is a constraint violation.
pub(crate) fn constraint_violation(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation => {
            Some(inner.extended_code)
        }
        _ => None,
    }
}
