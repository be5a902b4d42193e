//! Referral ledger.

use super::Database;
use crate::error::LedgerResult;
use crate::types::{Referral, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

const REFERRAL_COLUMNS: &str =
    "id, referrer_id, referred_id, bonus_referrer, bonus_referred, created_at";

fn parse_referral_row(row: &Row) -> rusqlite::Result<Referral> {
    Ok(Referral {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        referred_id: row.get(2)?,
        bonus_to_referrer: row.get(3)?,
        bonus_to_referred: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Record a referral and the bonuses paid for it.
pub(crate) fn insert_referral(
    conn: &Connection,
    referrer_id: UserId,
    referred_id: UserId,
    bonus_to_referrer: i64,
    bonus_to_referred: i64,
    created_at: i64,
) -> LedgerResult<Referral> {
    conn.execute(
        "INSERT INTO referrals
             (referrer_id, referred_id, bonus_referrer, bonus_referred, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![referrer_id, referred_id, bonus_to_referrer, bonus_to_referred, created_at],
    )?;

    Ok(Referral {
        id: conn.last_insert_rowid(),
        referrer_id,
        referred_id,
        bonus_to_referrer,
        bonus_to_referred,
        created_at,
    })
}

impl Database {
    /// The referral that brought in `referred_id`, if any.
    pub fn get_referral_for(&self, referred_id: UserId) -> LedgerResult<Option<Referral>> {
        self.with_conn(|conn| {
            let referral = conn
                .query_row(
                    &format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referred_id = ?1"),
                    params![referred_id],
                    parse_referral_row,
                )
                .optional()?;
            Ok(referral)
        })
    }

    /// Everyone `referrer_id` has referred, oldest first.
    pub fn referrals_by(&self, referrer_id: UserId) -> LedgerResult<Vec<Referral>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referrer_id = ?1 ORDER BY id"
            ))?;
            let referrals = stmt
                .query_map(params![referrer_id], parse_referral_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(referrals)
        })
    }

    /// Total number of referral rows naming `referred_id`.
    pub fn referral_count_for(&self, referred_id: UserId) -> LedgerResult<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM referrals WHERE referred_id = ?1",
                params![referred_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}
