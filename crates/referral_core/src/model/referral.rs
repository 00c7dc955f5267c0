//! Referral and ledger records.
//!
//! # Invariants
//! - Every `Referral` has exactly one `ReferralPoint`.
//! - `ReferralPoint::points_earned` equals the delta applied to the
//!   referrer's balance for that referral.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

/// Storage-assigned referral identifier.
pub type ReferralId = i64;

/// A recorded claim that `referrer_id` brought in `referred_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub referrer_id: UserId,
    pub referred_id: UserId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Audit ledger entry for one referral award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralPoint {
    pub id: i64,
    pub referral_id: ReferralId,
    pub points_earned: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Result of one committed `record_referral` transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralReceipt {
    pub referral: Referral,
    pub point: ReferralPoint,
    /// Referrer's balance after the award was applied.
    pub referrer_points: i64,
}
