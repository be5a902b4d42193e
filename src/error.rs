//! Ledger error taxonomy and the structured body returned to API callers.

use crate::types::UserId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidInput,
    SelfReferral,

    // Not found errors
    UnknownTask,
    UnknownUser,
    UnknownReferrer,

    // Conflict errors
    ReferrerAlreadySet,
    UsernameTaken,
    BalanceOverflow,
    Conflict,

    // Request errors raised by the HTTP layer
    InvalidRequest,
    Unauthorized,
    Forbidden,

    // Internal errors
    StorageFailure,
    InternalError,
}

/// Failure of a ledger operation.
///
/// Every variant is a distinct outcome for the caller. An idempotent repeat of
/// a task completion is not an error and never shows up here.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("User not found: {0}")]
    UnknownUser(UserId),

    #[error("Referrer not found: {0}")]
    UnknownReferrer(UserId),

    #[error("User {0} cannot refer themselves")]
    SelfReferral(UserId),

    #[error("Referrer already set for user {0}")]
    ReferrerAlreadySet(UserId),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Balance of user {0} would exceed the maximum")]
    BalanceOverflow(UserId),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The store refused the unit of work because a concurrent one holds the
    /// write lock. Nothing was applied; the whole operation may be retried.
    #[error("Concurrent update conflict, retry the operation: {0}")]
    Conflict(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::UnknownTask(_) => ErrorCode::UnknownTask,
            LedgerError::UnknownUser(_) => ErrorCode::UnknownUser,
            LedgerError::UnknownReferrer(_) => ErrorCode::UnknownReferrer,
            LedgerError::SelfReferral(_) => ErrorCode::SelfReferral,
            LedgerError::ReferrerAlreadySet(_) => ErrorCode::ReferrerAlreadySet,
            LedgerError::UsernameTaken(_) => ErrorCode::UsernameTaken,
            LedgerError::BalanceOverflow(_) => ErrorCode::BalanceOverflow,
            LedgerError::InvalidInput { .. } => ErrorCode::InvalidInput,
            LedgerError::Conflict(_) => ErrorCode::Conflict,
            LedgerError::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        if is_busy_error(&err) {
            LedgerError::Conflict(err.to_string())
        } else {
            LedgerError::Storage(err.to_string())
        }
    }
}

/// Check if an error is a SQLite busy/locked error, i.e. lost lock contention.
fn is_busy_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

/// Check if an error is a uniqueness or check constraint violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Structured error body for API responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            retryable: false,
        }
    }
}

impl From<&LedgerError> for ErrorBody {
    fn from(err: &LedgerError) -> Self {
        let field = match err {
            LedgerError::InvalidInput { field, .. } => Some(field.to_string()),
            _ => None,
        };
        Self {
            code: err.code(),
            message: err.to_string(),
            field,
            retryable: err.is_retryable(),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
