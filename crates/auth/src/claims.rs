use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockledger_core::UserId;

/// Which role a token plays in the login flow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token accepted by protected endpoints.
    Access,
    /// Longer-lived token only accepted to mint a new access token.
    Refresh,
}

/// JWT claims model (transport-agnostic).
///
/// This is the minimal set of claims expected once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Login name of the subject.
    pub username: String,

    pub token_type: TokenKind,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("expected a {expected:?} token, got {actual:?}")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

/// Deterministically validate JWT claims.
///
/// This validates the *claims* only. Signature verification happens in
/// [`crate::token`].
pub fn validate_claims(
    claims: &JwtClaims,
    expected: TokenKind,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.token_type != expected {
        return Err(TokenValidationError::WrongKind {
            expected,
            actual: claims.token_type,
        });
    }
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
