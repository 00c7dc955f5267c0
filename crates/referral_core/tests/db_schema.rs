use referral_core::db::migrations::latest_version;
use referral_core::db::{ensure_schema, open_db, open_db_in_memory, DbError};
use referral_core::{NewUser, SqliteUserRepository, UserRepository};
use rusqlite::{Connection, OpenFlags};

#[test]
fn open_db_in_memory_creates_ledger_tables() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "referrals");
    assert_table_exists(&conn, "referral_points");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn ensure_schema_is_idempotent_and_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("referral_system.db");

    let user_id = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteUserRepository::try_new(&conn).unwrap();
        repo.create_user(&NewUser::new("Alice", "a@x.com", "hash"))
            .unwrap()
    };

    let mut conn = open_db(&path).unwrap();
    ensure_schema(&mut conn).unwrap();
    ensure_schema(&mut conn).unwrap();
    assert_eq!(schema_version(&conn), latest_version());

    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let user = repo.get_user(user_id).unwrap().unwrap();
    assert_eq!(user.name, "Alice");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(err.is_schema_error());
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ddl_failure_surfaces_schema_error_and_applies_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readonly.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (x INTEGER);")
        .unwrap();

    let mut conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY).unwrap();
    let err = ensure_schema(&mut conn).unwrap_err();
    assert!(matches!(err, DbError::Schema { version: 1, .. }));
    assert!(err.to_string().contains("schema version 1"));
    drop(conn);

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    let users_exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'users');",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(users_exists, 0);
}

#[test]
fn repositories_refuse_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteUserRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        referral_core::RepoError::Db(DbError::MissingRequiredTable("users"))
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
