use referral_core::{ReferralStore, RepoError, StoreConfig};
use std::sync::Arc;
use std::thread;

const WRITERS: i64 = 4;
const REFERRALS_PER_WRITER: i64 = 10;

#[test]
fn concurrent_writers_keep_balances_and_ledger_in_sync() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ReferralStore::open(StoreConfig::new(dir.path().join("ledger.db"))).unwrap());

    let hub = store.register_user("Hub", "hub@x.com", "h").unwrap();
    let referrers = (0..WRITERS)
        .map(|i| {
            store
                .register_user(&format!("r{i}"), &format!("r{i}@x.com"), "h")
                .unwrap()
        })
        .collect::<Vec<_>>();

    let handles = referrers
        .iter()
        .map(|&referrer| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..REFERRALS_PER_WRITER {
                    store.record_referral(referrer, hub).unwrap();
                    store.get_user_profile(referrer).unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    for referrer in referrers {
        let report = store.track_user(referrer).unwrap();
        assert_eq!(report.user.points, 10 * REFERRALS_PER_WRITER);
        assert_eq!(report.referrals.len() as i64, REFERRALS_PER_WRITER);
        assert_eq!(report.points_from_referrals, report.user.points);
    }
    assert_eq!(store.get_user_profile(hub).unwrap().points, 0);
}

#[test]
fn store_surfaces_typed_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = ReferralStore::open(StoreConfig::new(dir.path().join("ledger.db"))).unwrap();

    store.register_user("Alice", "a@x.com", "h").unwrap();
    assert!(matches!(
        store.register_user("Alice", "a@x.com", "h"),
        Err(RepoError::DuplicateEmail(_))
    ));
    assert!(matches!(
        store.record_referral(1, 2),
        Err(RepoError::UnknownUser(2))
    ));
    assert!(matches!(
        store.list_referrals_made(5),
        Err(RepoError::NotFound(5))
    ));
}
