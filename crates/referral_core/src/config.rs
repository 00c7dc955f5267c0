//! Referral policy and store configuration.
//!
//! # Responsibility
//! - Hold the tunable rules of the Referral Recorder.
//! - Stay deserializable so a host application can load them from its own
//!   config file.
//!
//! # Invariants
//! - `award_points` is the single source for both the balance delta and the
//!   ledger entry of every referral.

use crate::model::user::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Points credited to a referrer per recorded referral.
pub const DEFAULT_REFERRAL_AWARD: i64 = 10;

/// Default database file name, matching the historical on-disk layout.
pub const DEFAULT_DB_FILE_NAME: &str = "referral_system.db";

/// Rules applied by `record_referral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralPolicy {
    /// Fixed award per referral. Must be positive.
    pub award_points: i64,
    /// Whether a user may refer themselves. Off by default.
    pub allow_self_referral: bool,
    /// Whether the same `(referrer, referred)` pair may be recorded again.
    pub allow_duplicate_pairs: bool,
}

impl Default for ReferralPolicy {
    fn default() -> Self {
        Self {
            award_points: DEFAULT_REFERRAL_AWARD,
            allow_self_referral: false,
            allow_duplicate_pairs: true,
        }
    }
}

impl ReferralPolicy {
    /// Rejects policies that would break ledger invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.award_points <= 0 {
            return Err(ValidationError::NonPositiveAward(self.award_points));
        }
        Ok(())
    }
}

/// Configuration for [`crate::store::ReferralStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default)]
    pub policy: ReferralPolicy,
}

impl StoreConfig {
    /// Config for `db_path` with the default policy.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            policy: ReferralPolicy::default(),
        }
    }

    /// Checks the policy and rejects paths that SQLite treats as private
    /// temporary databases.
    ///
    /// The store opens one connection per call, so an in-memory or empty
    /// path would hand every call its own empty database.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.policy.validate()?;
        if is_transient_db_path(&self.db_path) {
            return Err(ValidationError::TransientDbPath(
                self.db_path.display().to_string(),
            ));
        }
        Ok(())
    }
}

fn is_transient_db_path(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return true;
    }
    let Some(raw) = path.to_str() else {
        return false;
    };
    raw == ":memory:"
        || (raw.starts_with("file:") && (raw.contains(":memory:") || raw.contains("mode=memory")))
}

#[cfg(test)]
mod tests {
    use super::{ReferralPolicy, StoreConfig, DEFAULT_REFERRAL_AWARD};
    use std::path::Path;
    use crate::model::user::ValidationError;

    #[test]
    fn default_policy_awards_ten_and_forbids_self_referral() {
        let policy = ReferralPolicy::default();
        assert_eq!(policy.award_points, DEFAULT_REFERRAL_AWARD);
        assert!(!policy.allow_self_referral);
        assert!(policy.allow_duplicate_pairs);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_award() {
        let policy = ReferralPolicy {
            award_points: 0,
            ..ReferralPolicy::default()
        };
        assert_eq!(policy.validate(), Err(ValidationError::NonPositiveAward(0)));
    }

    #[test]
    fn store_config_fills_missing_policy_fields_from_defaults() {
        let config: StoreConfig = serde_json::from_str(
            r#"{ "db_path": "/tmp/ledger.db", "policy": { "allow_duplicate_pairs": false } }"#,
        )
        .unwrap();
        assert_eq!(config.db_path.to_str(), Some("/tmp/ledger.db"));
        assert_eq!(config.policy.award_points, DEFAULT_REFERRAL_AWARD);
        assert!(!config.policy.allow_duplicate_pairs);

        let bare: StoreConfig = serde_json::from_str(r#"{ "db_path": "ledger.db" }"#).unwrap();
        assert_eq!(bare.policy, ReferralPolicy::default());
    }

    #[test]
    fn validate_rejects_in_memory_and_empty_paths() {
        for path in ["", ":memory:", "file::memory:?cache=shared", "file:ledger?mode=memory"] {
            assert_eq!(
                StoreConfig::new(path).validate(),
                Err(ValidationError::TransientDbPath(path.to_string())),
                "{path:?}"
            );
        }
        assert!(StoreConfig::new(Path::new("/tmp/ledger.db")).validate().is_ok());
        assert!(StoreConfig::new("file:ledger.db").validate().is_ok());
    }
}
