//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Insert and read `users` rows.
//! - Map the engine's email uniqueness violation to `DuplicateEmail`.
//!
//! # Invariants
//! - Write paths call `NewUser::validate()` before SQL mutations.
//! - Read paths reject rows with negative balances instead of masking them.

use crate::db::verify_schema;
use crate::model::user::{NewUser, User, UserId};
use crate::repo::error::{constraint_violation, RepoError, RepoResult};
use rusqlite::{ffi, params, Connection, Row};

pub(crate) const USER_SELECT_SQL: &str = "SELECT
    user_id,
    name,
    email,
    password_hash,
    points,
    created_at
FROM users";

/// Repository interface for the User Registry.
pub trait UserRepository {
    /// Inserts a user with a zero balance and returns the assigned id.
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Looks a user up by email, ignoring case.
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn user_exists(&self, id: UserId) -> RepoResult<bool>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository over a connection with a verified schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        verify_schema(conn)?;
        Ok(Self::from_verified(conn))
    }

    /// Skips verification for connections that just went through `open_db`.
    pub(crate) fn from_verified(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId> {
        user.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO users (name, email, password_hash, points)
             VALUES (?1, ?2, ?3, 0);",
            params![
                user.name.as_str(),
                user.email.as_str(),
                user.password_hash.as_str(),
            ],
        );

        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if constraint_violation(&err) == Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                Err(RepoError::DuplicateEmail(user.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        load_user(self.conn, id)
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn user_exists(&self, id: UserId) -> RepoResult<bool> {
        Ok(user_exists(self.conn, id)?)
    }
}

pub(crate) fn load_user(conn: &Connection, id: UserId) -> RepoResult<Option<User>> {
    let mut stmt = conn.prepare_cached(&format!("{USER_SELECT_SQL} WHERE user_id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_user_row(row)?));
    }
    Ok(None)
}

pub(crate) fn user_exists(conn: &Connection, id: UserId) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: UserId = row.get("user_id")?;
    let points: i64 = row.get("points")?;
    if points < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative points value `{points}` in users.points for user {id}"
        )));
    }

    Ok(User {
        id,
        name: row.get("name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        points,
        created_at: row.get("created_at")?,
    })
}
