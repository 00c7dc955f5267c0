//! Referral repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Record a referral, credit the referrer and append the ledger entry in
//!   one transaction.
//! - Stream the referrals a user made without loading them all at once.
//!
//! # Invariants
//! - `record_referral` commits all three mutations or none.
//! - The balance delta and `points_earned` come from the same policy value.
//! - Listing order is `referral_id ASC` (insertion order).

use crate::config::ReferralPolicy;
use crate::db::verify_schema;
use crate::model::referral::{Referral, ReferralId, ReferralPoint, ReferralReceipt};
use crate::model::user::{UserId, ValidationError};
use crate::repo::error::{constraint_violation, RepoError, RepoResult};
use crate::repo::user_repo::user_exists;
use rusqlite::{ffi, params, Connection, Row, TransactionBehavior};
use std::collections::VecDeque;

const REFERRAL_SELECT_SQL: &str = "SELECT
    referral_id,
    referrer_id,
    referred_id,
    created_at
FROM referrals";

const REFERRAL_POINT_SELECT_SQL: &str = "SELECT
    point_id,
    referral_id,
    points_earned,
    created_at
FROM referral_points";

const REFERRALS_MADE_BATCH_SIZE: usize = 64;

/// Lazy stream of referrals; yields at most one error, then ends.
pub type ReferralStream<'a> = Box<dyn Iterator<Item = RepoResult<Referral>> + 'a>;

/// Read-only referral and ledger queries.
pub trait ReferralReader {
    fn get_referral(&self, id: ReferralId) -> RepoResult<Option<Referral>>;
    /// Streams referrals where `referrer_id` matches, oldest first.
    fn list_referrals_made(&self, referrer_id: UserId) -> ReferralStream<'_>;
    fn list_points_for_referral(&self, referral_id: ReferralId) -> RepoResult<Vec<ReferralPoint>>;
    /// Sum of ledger entries attributed to referrals made by `referrer_id`.
    fn points_earned_total(&self, referrer_id: UserId) -> RepoResult<i64>;
}

/// Referral writes on top of the read contract.
pub trait ReferralRepository: ReferralReader {
    fn record_referral(
        &mut self,
        referrer_id: UserId,
        referred_id: UserId,
        policy: &ReferralPolicy,
    ) -> RepoResult<ReferralReceipt>;
}

/// SQLite-backed read-only referral queries over a shared connection.
pub struct SqliteReferralReader<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferralReader<'conn> {
    /// Constructs a reader over a connection with a verified schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        verify_schema(conn)?;
        Ok(Self::from_verified(conn))
    }

    pub(crate) fn from_verified(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReferralReader for SqliteReferralReader<'_> {
    fn get_referral(&self, id: ReferralId) -> RepoResult<Option<Referral>> {
        load_referral(self.conn, id)
    }

    fn list_referrals_made(&self, referrer_id: UserId) -> ReferralStream<'_> {
        Box::new(ReferralsMade::new(self.conn, referrer_id))
    }

    fn list_points_for_referral(&self, referral_id: ReferralId) -> RepoResult<Vec<ReferralPoint>> {
        load_points_for_referral(self.conn, referral_id)
    }

    fn points_earned_total(&self, referrer_id: UserId) -> RepoResult<i64> {
        load_points_earned_total(self.conn, referrer_id)
    }
}

/// SQLite-backed referral repository.
///
/// Holds the connection mutably because recording opens a transaction.
pub struct SqliteReferralRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteReferralRepository<'conn> {
    /// Constructs a repository over a connection with a verified schema.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        verify_schema(conn)?;
        Ok(Self::from_verified(conn))
    }

    pub(crate) fn from_verified(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl ReferralReader for SqliteReferralRepository<'_> {
    fn get_referral(&self, id: ReferralId) -> RepoResult<Option<Referral>> {
        load_referral(self.conn, id)
    }

    fn list_referrals_made(&self, referrer_id: UserId) -> ReferralStream<'_> {
        Box::new(ReferralsMade::new(self.conn, referrer_id))
    }

    fn list_points_for_referral(&self, referral_id: ReferralId) -> RepoResult<Vec<ReferralPoint>> {
        load_points_for_referral(self.conn, referral_id)
    }

    fn points_earned_total(&self, referrer_id: UserId) -> RepoResult<i64> {
        load_points_earned_total(self.conn, referrer_id)
    }
}

impl ReferralRepository for SqliteReferralRepository<'_> {
    fn record_referral(
        &mut self,
        referrer_id: UserId,
        referred_id: UserId,
        policy: &ReferralPolicy,
    ) -> RepoResult<ReferralReceipt> {
        policy.validate()?;
        if referrer_id == referred_id && !policy.allow_self_referral {
            return Err(ValidationError::SelfReferral(referrer_id).into());
        }
        let award = policy.award_points;

        // Dropping `tx` on any early return rolls every statement back.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for id in [referrer_id, referred_id] {
            if !user_exists(&tx, id)? {
                return Err(RepoError::UnknownUser(id));
            }
        }

        if !policy.allow_duplicate_pairs && referral_pair_exists(&tx, referrer_id, referred_id)? {
            return Err(RepoError::DuplicateReferral {
                referrer_id,
                referred_id,
            });
        }

        tx.execute(
            "INSERT INTO referrals (referrer_id, referred_id) VALUES (?1, ?2);",
            params![referrer_id, referred_id],
        )
        .map_err(|err| translate_foreign_key(&tx, err, &[referrer_id, referred_id]))?;
        let referral_id = tx.last_insert_rowid();

        let credited = tx.execute(
            "UPDATE users SET points = points + ?1 WHERE user_id = ?2;",
            params![award, referrer_id],
        )?;
        // A trigger may swallow the update; the ledger must not outrun the balance.
        if credited != 1 {
            return Err(RepoError::InvalidData(format!(
                "crediting referrer {referrer_id} changed {credited} rows"
            )));
        }

        tx.execute(
            "INSERT INTO referral_points (referral_id, points_earned) VALUES (?1, ?2);",
            params![referral_id, award],
        )?;
        let point_id = tx.last_insert_rowid();

        let referral = load_referral(&tx, referral_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("referral {referral_id} missing after insert"))
        })?;
        let point = load_point(&tx, point_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("referral point {point_id} missing after insert"))
        })?;
        let referrer_points: i64 = tx.query_row(
            "SELECT points FROM users WHERE user_id = ?1;",
            [referrer_id],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(ReferralReceipt {
            referral,
            point,
            referrer_points,
        })
    }
}

/// Keyset-paginated iterator over the referrals one user made.
///
/// Each batch prepares, runs and releases its own statement, so no SQLite
/// statement stays open between `next` calls. Not restartable: once drained
/// or failed it keeps returning `None`.
pub struct ReferralsMade<'conn> {
    conn: &'conn Connection,
    referrer_id: UserId,
    last_seen: ReferralId,
    buffer: VecDeque<Referral>,
    exhausted: bool,
}

impl<'conn> ReferralsMade<'conn> {
    fn new(conn: &'conn Connection, referrer_id: UserId) -> Self {
        Self {
            conn,
            referrer_id,
            last_seen: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fetch_batch(&mut self) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{REFERRAL_SELECT_SQL}
             WHERE referrer_id = ?1
               AND referral_id > ?2
             ORDER BY referral_id ASC
             LIMIT ?3;"
        ))?;
        let mut rows = stmt.query(params![
            self.referrer_id,
            self.last_seen,
            REFERRALS_MADE_BATCH_SIZE as i64
        ])?;

        let mut fetched = 0;
        while let Some(row) = rows.next()? {
            let referral = parse_referral_row(row)?;
            self.last_seen = referral.id;
            self.buffer.push_back(referral);
            fetched += 1;
        }

        if fetched < REFERRALS_MADE_BATCH_SIZE {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl Iterator for ReferralsMade<'_> {
    type Item = RepoResult<Referral>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fetch_batch() {
                self.exhausted = true;
                self.buffer.clear();
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

fn load_referral(conn: &Connection, id: ReferralId) -> RepoResult<Option<Referral>> {
    let mut stmt =
        conn.prepare_cached(&format!("{REFERRAL_SELECT_SQL} WHERE referral_id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_referral_row(row)?));
    }
    Ok(None)
}

fn load_point(conn: &Connection, id: i64) -> RepoResult<Option<ReferralPoint>> {
    let mut stmt =
        conn.prepare_cached(&format!("{REFERRAL_POINT_SELECT_SQL} WHERE point_id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_point_row(row)?));
    }
    Ok(None)
}

fn load_points_for_referral(
    conn: &Connection,
    referral_id: ReferralId,
) -> RepoResult<Vec<ReferralPoint>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{REFERRAL_POINT_SELECT_SQL}
         WHERE referral_id = ?1
         ORDER BY point_id ASC;"
    ))?;
    let mut rows = stmt.query([referral_id])?;
    let mut points = Vec::new();
    while let Some(row) = rows.next()? {
        points.push(parse_point_row(row)?);
    }
    Ok(points)
}

fn load_points_earned_total(conn: &Connection, referrer_id: UserId) -> RepoResult<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(rp.points_earned), 0)
         FROM referral_points rp
         INNER JOIN referrals r ON r.referral_id = rp.referral_id
         WHERE r.referrer_id = ?1;",
        [referrer_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

fn referral_pair_exists(
    conn: &Connection,
    referrer_id: UserId,
    referred_id: UserId,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM referrals
            WHERE referrer_id = ?1 AND referred_id = ?2
        );",
        params![referrer_id, referred_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Maps a foreign-key violation to the first referenced user that is missing.
///
/// Backstop for the existence check done earlier in the same transaction.
/// When every user is still present after the failed statement, the engine
/// error is returned unchanged.
fn translate_foreign_key(conn: &Connection, err: rusqlite::Error, ids: &[UserId]) -> RepoError {
    if constraint_violation(&err) != Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) {
        return err.into();
    }
    for &id in ids {
        match user_exists(conn, id) {
            Ok(false) => return RepoError::UnknownUser(id),
            Ok(true) => {}
            Err(lookup_err) => return lookup_err.into(),
        }
    }
    err.into()
}

fn parse_referral_row(row: &Row<'_>) -> RepoResult<Referral> {
    Ok(Referral {
        id: row.get("referral_id")?,
        referrer_id: row.get("referrer_id")?,
        referred_id: row.get("referred_id")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_point_row(row: &Row<'_>) -> RepoResult<ReferralPoint> {
    let points_earned: i64 = row.get("points_earned")?;
    if points_earned <= 0 {
        return Err(RepoError::InvalidData(format!(
            "non-positive points_earned `{points_earned}` in referral_points"
        )));
    }

    Ok(ReferralPoint {
        id: row.get("point_id")?,
        referral_id: row.get("referral_id")?,
        points_earned,
        created_at: row.get("created_at")?,
    })
}
