//! Profile Reporter use-case service.
//!
//! # Responsibility
//! - Read a user's profile and the referrals they originated.
//! - Assemble the combined tracking report.
//!
//! # Invariants
//! - Read-only: never opens a write transaction.
//! - A user with no referrals yields an empty listing, not an error.

use crate::model::referral::Referral;
use crate::model::user::{User, UserId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::referral_repo::{ReferralReader, ReferralStream};
use crate::repo::user_repo::UserRepository;
use serde::Serialize;

/// Profile plus everything the user referred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReport {
    pub user: User,
    /// Oldest first.
    pub referrals: Vec<Referral>,
    /// Ledger sum for `referrals`; equals `user.points` when all points
    /// came from referrals.
    pub points_from_referrals: i64,
}

/// Read-side service over user and referral repositories.
pub struct ProfileService<U: UserRepository, R: ReferralReader> {
    users: U,
    referrals: R,
}

impl<U: UserRepository, R: ReferralReader> ProfileService<U, R> {
    pub fn new(users: U, referrals: R) -> Self {
        Self { users, referrals }
    }

    /// Reads one user; missing ids are `RepoError::NotFound`.
    pub fn get_user_profile(&self, user_id: UserId) -> RepoResult<User> {
        self.users
            .get_user(user_id)?
            .ok_or(RepoError::NotFound(user_id))
    }

    /// Lazily streams referrals made by `user_id`.
    ///
    /// Returns `RepoError::NotFound` up front for unknown users.
    pub fn list_referrals_made(&self, user_id: UserId) -> RepoResult<ReferralStream<'_>> {
        if !self.users.user_exists(user_id)? {
            return Err(RepoError::NotFound(user_id));
        }
        Ok(self.referrals.list_referrals_made(user_id))
    }

    /// Builds the full tracking report for one user.
    pub fn track_user(&self, user_id: UserId) -> RepoResult<UserReport> {
        let user = self.get_user_profile(user_id)?;
        let referrals = self
            .referrals
            .list_referrals_made(user_id)
            .collect::<RepoResult<Vec<_>>>()?;
        let points_from_referrals = self.referrals.points_earned_total(user_id)?;
        Ok(UserReport {
            user,
            referrals,
            points_from_referrals,
        })
    }
}
