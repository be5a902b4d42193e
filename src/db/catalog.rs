//! Task catalog: the point value and title of every completable task.

use super::Database;
use crate::error::{LedgerError, LedgerResult};
use crate::types::Task;
use rusqlite::{Connection, OptionalExtension, params};

pub(crate) fn fetch_task(conn: &Connection, code: &str) -> LedgerResult<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT code, title, points FROM tasks WHERE code = ?1",
            params![code],
            |row| {
                Ok(Task {
                    code: row.get(0)?,
                    title: row.get(1)?,
                    points: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(task)
}

impl Database {
    /// Insert a catalog task, or replace the title and value of an existing one.
    ///
    /// Changing the value never touches balances already awarded for it.
    pub fn upsert_task(&self, code: &str, title: &str, points: i64) -> LedgerResult<Task> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LedgerError::invalid("code", "must not be empty"));
        }
        if points < 0 {
            return Err(LedgerError::invalid("points", "must not be negative"));
        }

        self.write_tx(|tx| {
            tx.execute(
                "INSERT INTO tasks (code, title, points) VALUES (?1, ?2, ?3)
                 ON CONFLICT (code) DO UPDATE SET title = excluded.title, points = excluded.points",
                params![code, title, points],
            )?;
            Ok(Task {
                code: code.to_string(),
                title: title.to_string(),
                points,
            })
        })
    }

    /// Get a catalog task by code.
    pub fn get_task(&self, code: &str) -> LedgerResult<Option<Task>> {
        self.with_conn(|conn| fetch_task(conn, code))
    }

    /// List the catalog ordered by code.
    pub fn list_tasks(&self) -> LedgerResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT code, title, points FROM tasks ORDER BY code")?;
            let tasks = stmt
                .query_map([], |row| {
                    Ok(Task {
                        code: row.get(0)?,
                        title: row.get(1)?,
                        points: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }
}
