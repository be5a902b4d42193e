//! Database layer for the points ledger.
//!
//! Every `Database` handle owns one SQLite connection. Handles on the same file
//! (in this process or another) coordinate only through SQLite itself: writes
//! run in `BEGIN IMMEDIATE` transactions, so a check-then-act sequence inside
//! [`Database::write_tx`] can never interleave with another writer.

pub mod accounts;
pub mod catalog;
pub mod completions;
pub mod leaderboard;
pub mod referrals;

use crate::error::{LedgerError, LedgerResult};
use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// How long a writer waits for the write lock before giving up with a conflict.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while a writer holds the lock
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout={BUSY_TIMEOUT_MS};"
        ))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.lock()?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::storage("connection lock poisoned"))
    }

    /// Execute a read with access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&Connection) -> LedgerResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute `f` inside a write transaction.
    ///
    /// The transaction takes the database write lock up front. It commits only
    /// if `f` returns `Ok`; any error (including a failed commit) drops the
    /// transaction, which rolls back every statement `f` executed.
    pub fn write_tx<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> LedgerResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
