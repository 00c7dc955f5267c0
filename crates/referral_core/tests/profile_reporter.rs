use referral_core::db::open_db_in_memory;
use referral_core::{
    ProfileService, ReferralRepository, RepoError, SqliteReferralReader,
    SqliteReferralRepository, SqliteUserRepository, UserRepository, NewUser, ReferralPolicy,
};
use rusqlite::Connection;

fn seed(conn: &mut Connection) -> Vec<i64> {
    let ids = {
        let users = SqliteUserRepository::try_new(conn).unwrap();
        ["alice", "bob", "carol", "dave"]
            .iter()
            .map(|name| {
                users
                    .create_user(&NewUser::new(*name, format!("{name}@x.com"), "hash"))
                    .unwrap()
            })
            .collect::<Vec<_>>()
    };

    let mut referrals = SqliteReferralRepository::try_new(conn).unwrap();
    let policy = ReferralPolicy::default();
    referrals.record_referral(ids[0], ids[1], &policy).unwrap();
    referrals.record_referral(ids[2], ids[3], &policy).unwrap();
    referrals.record_referral(ids[0], ids[2], &policy).unwrap();
    ids
}

#[test]
fn list_referrals_made_returns_only_that_users_referrals_in_insertion_order() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn);
    let service = ProfileService::new(
        SqliteUserRepository::try_new(&conn).unwrap(),
        SqliteReferralReader::try_new(&conn).unwrap(),
    );

    let made = service
        .list_referrals_made(ids[0])
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let referred = made.iter().map(|r| r.referred_id).collect::<Vec<_>>();
    assert_eq!(referred, vec![ids[1], ids[2]]);
    assert!(made.iter().all(|r| r.referrer_id == ids[0]));
    assert!(made[0].id < made[1].id);
}

#[test]
fn list_referrals_made_is_empty_for_user_without_referrals() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn);
    let service = ProfileService::new(
        SqliteUserRepository::try_new(&conn).unwrap(),
        SqliteReferralReader::try_new(&conn).unwrap(),
    );

    let mut stream = service.list_referrals_made(ids[3]).unwrap();
    assert!(stream.next().is_none());
}

#[test]
fn unknown_user_profile_and_listing_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ProfileService::new(
        SqliteUserRepository::try_new(&conn).unwrap(),
        SqliteReferralReader::try_new(&conn).unwrap(),
    );

    assert!(matches!(
        service.get_user_profile(7),
        Err(RepoError::NotFound(7))
    ));
    assert!(matches!(
        service.list_referrals_made(7).err(),
        Some(RepoError::NotFound(7))
    ));
}

#[test]
fn track_user_reports_profile_referrals_and_consistent_ledger() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn);
    let service = ProfileService::new(
        SqliteUserRepository::try_new(&conn).unwrap(),
        SqliteReferralReader::try_new(&conn).unwrap(),
    );

    let report = service.track_user(ids[0]).unwrap();
    assert_eq!(report.user.name, "alice");
    assert_eq!(report.user.points, 20);
    assert_eq!(report.referrals.len(), 2);
    assert_eq!(report.points_from_referrals, report.user.points);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["user"].get("password_hash").is_none());
    assert_eq!(json["referrals"][0]["referred_id"], ids[1]);
}
