//! Completion ledger: one row per (user, task) pair, ever.

use super::Database;
use crate::error::LedgerResult;
use crate::types::{CompletedTask, UserId};
use rusqlite::{Connection, params};

/// Record that `user_id` completed `task_code`, unless it is already recorded.
///
/// A single conflict-tolerant insert: returns `true` only for the call that
/// created the row.
pub(crate) fn insert_completion(
    conn: &Connection,
    user_id: UserId,
    task_code: &str,
    completed_at: i64,
) -> LedgerResult<bool> {
    let inserted = conn.execute(
        "INSERT INTO user_tasks (user_id, task_code, completed_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (user_id, task_code) DO NOTHING",
        params![user_id, task_code, completed_at],
    )?;
    Ok(inserted == 1)
}

/// Completion history of a user, most recent first.
pub(crate) fn completions_for(
    conn: &Connection,
    user_id: UserId,
) -> LedgerResult<Vec<CompletedTask>> {
    // rowid breaks ties between completions in the same millisecond
    let mut stmt = conn.prepare(
        "SELECT t.code, t.title, t.points, ut.completed_at
         FROM user_tasks ut
         JOIN tasks t ON t.code = ut.task_code
         WHERE ut.user_id = ?1
         ORDER BY ut.completed_at DESC, ut.rowid DESC",
    )?;

    let completions = stmt
        .query_map(params![user_id], |row| {
            Ok(CompletedTask {
                code: row.get(0)?,
                title: row.get(1)?,
                points: row.get(2)?,
                completed_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(completions)
}

impl Database {
    /// Number of completion rows recorded for a pair (0 or 1).
    pub fn completion_count(&self, user_id: UserId, task_code: &str) -> LedgerResult<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM user_tasks WHERE user_id = ?1 AND task_code = ?2",
                params![user_id, task_code],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}
