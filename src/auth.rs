//! Bearer token minting, verification and per-user authorization.
//!
//! Tokens are HS256 JWTs whose `sub` claim carries the user id, either as a
//! decimal string or a JSON number, plus an optional `role`.

use crate::types::UserId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Role that may act on behalf of any user.
pub const ADMIN_ROLE: &str = "admin";

/// Subject claim as issued by different token producers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Number(i64),
    Text(String),
}

impl Subject {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Subject::Number(n) => Some(*n),
            Subject::Text(s) => s.parse().ok(),
        }
    }
}

/// JWT claims understood by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Subject,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    /// Allow acting as `user_id` if the token is that user's or an admin's.
    pub fn authorize(&self, user_id: UserId) -> Result<(), AuthError> {
        if self.is_admin() || self.sub.user_id() == Some(user_id) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("forbidden")]
    Forbidden,
}

/// Mint a token for `user_id`, valid for `ttl`.
pub fn mint_token(
    secret: &[u8],
    user_id: UserId,
    role: Option<&str>,
    ttl: Duration,
) -> jsonwebtoken::errors::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims {
        sub: Subject::Text(user_id.to_string()),
        iat: now,
        exp: now.saturating_add(ttl),
        role: role.map(str::to_string),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Verify signature, algorithm and expiry of a token.
pub fn verify_token(secret: &[u8], token: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    const PREFIX: &str = "Bearer ";
    match header {
        Some(value) if value.len() > PREFIX.len() && value.starts_with(PREFIX) => {
            Ok(&value[PREFIX.len()..])
        }
        _ => Err(AuthError::MissingToken),
    }
}
