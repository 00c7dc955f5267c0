//! User domain model and registration input.
//!
//! # Responsibility
//! - Define the persisted `User` record.
//! - Validate registration input before it reaches SQL.
//!
//! # Invariants
//! - `name`, `email` and `password_hash` are never empty and never contain
//!   NUL bytes (SQLite's `length()` stops at the first one).
//! - `points` is never negative.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

// One `@`, non-empty local part and domain, no whitespace.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("valid email regex"));

/// Storage-assigned user identifier.
pub type UserId = i64;

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Opaque hash supplied by the caller; never interpreted by core.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Referral points balance.
    pub points: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Registration input for a new user.
///
/// Construct with [`NewUser::new`] to get trimmed values; `validate` is
/// re-run by the repository before insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Builds registration input, trimming surrounding whitespace from
    /// `name` and `email`. The password hash is kept verbatim.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password_hash: password_hash.into(),
        }
    }

    /// Checks registration invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if self.password_hash.is_empty() {
            return Err(ValidationError::EmptyPasswordHash);
        }
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("password_hash", &self.password_hash),
        ] {
            if value.contains('\0') {
                return Err(ValidationError::NulByte(field));
            }
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ValidationError::MalformedEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Caller-fixable input errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    EmptyEmail,
    MalformedEmail(String),
    EmptyPasswordHash,
    /// Named field contains a NUL byte.
    NulByte(&'static str),
    /// Referrer and referred are the same user and the policy forbids it.
    SelfReferral(UserId),
    /// Referral award must be strictly positive.
    NonPositiveAward(i64),
    /// Database path that gives every connection a fresh temporary database.
    TransientDbPath(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name cannot be empty"),
            Self::EmptyEmail => write!(f, "email cannot be empty"),
            Self::MalformedEmail(value) => write!(f, "malformed email `{value}`"),
            Self::EmptyPasswordHash => write!(f, "password hash cannot be empty"),
            Self::NulByte(field) => write!(f, "{field} cannot contain NUL bytes"),
            Self::SelfReferral(id) => write!(f, "user {id} cannot refer themselves"),
            Self::NonPositiveAward(points) => {
                write!(f, "referral award must be positive, got {points}")
            }
            Self::TransientDbPath(path) => write!(
                f,
                "database path `{path}` is not persistent across connections"
            ),
        }
    }
}

impl Error for ValidationError {}
