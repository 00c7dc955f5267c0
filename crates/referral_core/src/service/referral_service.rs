//! Referral Recorder use-case service.
//!
//! # Invariants
//! - Every recorded referral credits exactly `policy.award_points`.
//! - A failed recording leaves no referral, balance change or ledger row.

use crate::config::ReferralPolicy;
use crate::model::referral::ReferralReceipt;
use crate::model::user::UserId;
use crate::repo::error::RepoResult;
use crate::repo::referral_repo::{ReferralRepository, ReferralStream};
use crate::service::user_service::error_code;
use log::{info, warn};
use std::time::Instant;

/// Use-case service for recording referrals under a policy.
pub struct ReferralService<R: ReferralRepository> {
    repo: R,
    policy: ReferralPolicy,
}

impl<R: ReferralRepository> ReferralService<R> {
    /// Creates a service with the default policy (10 points, no self-referral).
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, ReferralPolicy::default())
    }

    pub fn with_policy(repo: R, policy: ReferralPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> &ReferralPolicy {
        &self.policy
    }

    /// Records `referrer_id -> referred_id` and credits the referrer.
    ///
    /// # Errors
    /// - `RepoError::UnknownUser` when either id does not exist.
    /// - `RepoError::Validation` for self-referrals (unless allowed) or an
    ///   invalid policy.
    /// - `RepoError::DuplicateReferral` when the policy forbids repeats.
    /// - `RepoError::Db` for engine failures; nothing was committed.
    pub fn record_referral(
        &mut self,
        referrer_id: UserId,
        referred_id: UserId,
    ) -> RepoResult<ReferralReceipt> {
        let started_at = Instant::now();
        match self
            .repo
            .record_referral(referrer_id, referred_id, &self.policy)
        {
            Ok(receipt) => {
                info!(
                    "event=referral_record module=service status=ok referral_id={} referrer_id={} referred_id={} points_earned={} duration_ms={}",
                    receipt.referral.id,
                    referrer_id,
                    referred_id,
                    receipt.point.points_earned,
                    started_at.elapsed().as_millis()
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    "event=referral_record module=service status=error referrer_id={} referred_id={} error_code={} duration_ms={}",
                    referrer_id,
                    referred_id,
                    error_code(&err),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Streams referrals made by `referrer_id`, oldest first.
    pub fn list_referrals_made(&self, referrer_id: UserId) -> ReferralStream<'_> {
        self.repo.list_referrals_made(referrer_id)
    }
}
