//! Ranking view, computed on demand from the account store.

use super::Database;
use crate::error::LedgerResult;
use crate::types::LeaderboardEntry;
use rusqlite::params;

impl Database {
    /// Top `limit` accounts by points, ties broken by ascending id.
    ///
    /// Ranks are the 1-based row position, so tied balances still get
    /// distinct, stable ranks.
    pub fn leaderboard(&self, limit: u32) -> LedgerResult<Vec<LeaderboardEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, points FROM users
                 ORDER BY points DESC, id ASC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let entries = rows
                .into_iter()
                .zip(1u32..)
                .map(|((id, username, points), rank)| LeaderboardEntry {
                    id,
                    username,
                    points,
                    rank,
                })
                .collect();

            Ok(entries)
        })
    }
}
