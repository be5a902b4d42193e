//! Mapping of ledger and auth failures onto HTTP responses.

use crate::auth::AuthError;
use crate::error::{ErrorBody, ErrorCode, LedgerError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

/// Any failure a handler can return.
#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Auth(AuthError),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::UnknownTask(_)
                | LedgerError::UnknownReferrer(_)
                | LedgerError::SelfReferral(_)
                | LedgerError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                LedgerError::UnknownUser(_) => StatusCode::NOT_FOUND,
                LedgerError::ReferrerAlreadySet(_)
                | LedgerError::UsernameTaken(_)
                | LedgerError::BalanceOverflow(_)
                | LedgerError::Conflict(_) => StatusCode::CONFLICT,
                LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(AuthError::MissingToken | AuthError::InvalidToken) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Ledger(err) => ErrorBody::from(err),
            ApiError::Auth(err @ AuthError::Forbidden) => {
                ErrorBody::new(ErrorCode::Forbidden, err.to_string())
            }
            ApiError::Auth(err) => ErrorBody::new(ErrorCode::Unauthorized, err.to_string()),
            ApiError::BadRequest(msg) => ErrorBody::new(ErrorCode::InvalidRequest, msg.clone()),
            // Internal details stay in the log
            ApiError::Internal(_) => ErrorBody::new(ErrorCode::InternalError, "server error"),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Ledger(LedgerError::Storage(msg)) | ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
            }
            ApiError::Ledger(err @ LedgerError::Conflict(_)) => {
                warn!(error = %err, "Write conflict surfaced to caller");
            }
            _ => {}
        }
        (status, Json(self.body())).into_response()
    }
}
