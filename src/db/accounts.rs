//! Account store: registration, lookup and balance changes.

use super::{Database, now_ms};
use crate::error::{LedgerError, LedgerResult, is_constraint_violation};
use crate::types::{Account, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

const MAX_USERNAME_LEN: usize = 64;

fn parse_account_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        username: row.get("username")?,
        points: row.get("points")?,
        referrer_id: row.get("referrer_id")?,
        created_at: row.get("created_at")?,
    })
}

/// Fetch an account by id.
pub(crate) fn fetch_account(conn: &Connection, user_id: UserId) -> LedgerResult<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id, username, points, referrer_id, created_at FROM users WHERE id = ?1",
            params![user_id],
            parse_account_row,
        )
        .optional()?;
    Ok(account)
}

pub(crate) fn account_exists(conn: &Connection, user_id: UserId) -> LedgerResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Current referrer link of a user.
///
/// Outer `None` means the user does not exist; `Some(None)` means no referrer yet.
pub(crate) fn referrer_of(
    conn: &Connection,
    user_id: UserId,
) -> LedgerResult<Option<Option<UserId>>> {
    let link = conn
        .query_row(
            "SELECT referrer_id FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get::<_, Option<UserId>>(0),
        )
        .optional()?;
    Ok(link)
}

/// Add `amount` points to a balance.
///
/// Negative amounts are rejected. A sum past `i64::MAX` is `BalanceOverflow`.
/// Must run inside a write transaction.
pub(crate) fn credit_points(conn: &Connection, user_id: UserId, amount: i64) -> LedgerResult<()> {
    if amount < 0 {
        return Err(LedgerError::invalid("amount", "must not be negative"));
    }

    let balance: i64 = conn
        .query_row(
            "SELECT points FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(LedgerError::UnknownUser(user_id))?;

    let updated = balance
        .checked_add(amount)
        .ok_or(LedgerError::BalanceOverflow(user_id))?;

    conn.execute(
        "UPDATE users SET points = ?1 WHERE id = ?2",
        params![updated, user_id],
    )?;
    Ok(())
}

/// Link a user to their referrer, only if no referrer is set yet.
///
/// Returns `false` when the link already existed and nothing was written.
pub(crate) fn link_referrer(
    conn: &Connection,
    user_id: UserId,
    referrer_id: UserId,
) -> LedgerResult<bool> {
    let updated = conn.execute(
        "UPDATE users SET referrer_id = ?1 WHERE id = ?2 AND referrer_id IS NULL",
        params![referrer_id, user_id],
    )?;
    Ok(updated == 1)
}

impl Database {
    /// Register a new account with a zero balance.
    pub fn create_account(&self, username: &str) -> LedgerResult<Account> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LedgerError::invalid("username", "must not be empty"));
        }
        if username.len() > MAX_USERNAME_LEN {
            return Err(LedgerError::invalid(
                "username",
                format!("must be at most {} bytes", MAX_USERNAME_LEN),
            ));
        }

        let now = now_ms();
        self.write_tx(|tx| {
            let inserted = tx.execute(
                "INSERT INTO users (username, points, created_at) VALUES (?1, 0, ?2)",
                params![username, now],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => {
                    return Err(LedgerError::UsernameTaken(username.to_string()));
                }
                Err(e) => return Err(e.into()),
            }

            Ok(Account {
                id: tx.last_insert_rowid(),
                username: username.to_string(),
                points: 0,
                referrer_id: None,
                created_at: now,
            })
        })
    }

    /// Get an account by id.
    pub fn get_account(&self, user_id: UserId) -> LedgerResult<Option<Account>> {
        self.with_conn(|conn| fetch_account(conn, user_id))
    }

    /// Get an account by its unique username.
    pub fn find_account_by_username(&self, username: &str) -> LedgerResult<Option<Account>> {
        self.with_conn(|conn| {
            let account = conn
                .query_row(
                    "SELECT id, username, points, referrer_id, created_at
                     FROM users WHERE username = ?1",
                    params![username],
                    parse_account_row,
                )
                .optional()?;
            Ok(account)
        })
    }
}
