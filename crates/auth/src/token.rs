//! HS256 token issuing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenKind, TokenValidationError, validate_claims};
use crate::credentials::UserAccount;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token could not be decoded: {0}")]
    Decode(String),

    #[error("token could not be encoded: {0}")]
    Encode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Access + refresh token issued on login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Verifies a signed token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Mints signed tokens for an authenticated user.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, user: &UserAccount, kind: TokenKind, now: DateTime<Utc>) -> Result<String, TokenError>;

    fn issue_pair(&self, user: &UserAccount, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user, TokenKind::Access, now)?,
            refresh: self.issue(user, TokenKind::Refresh, now)?,
        })
    }
}

/// Shared-secret (HS256) implementation of both token traits.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Exchange a refresh token for a fresh access token.
    pub fn refresh_access(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = self.validate(refresh_token, TokenKind::Refresh, now)?;
        let access = JwtClaims {
            sub: claims.sub,
            username: claims.username,
            token_type: TokenKind::Access,
            issued_at: now,
            expires_at: now + self.access_ttl,
        };
        self.encode(&access)
    }

    fn encode(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, user: &UserAccount, kind: TokenKind, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims {
            sub: user.id,
            username: user.username.clone(),
            token_type: kind,
            issued_at: now,
            expires_at: now + self.ttl(kind),
        };
        self.encode(&claims)
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        // Time checks are done by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Decode(e.to_string()))?;

        validate_claims(&data.claims, kind, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::PasswordHash;
    use stockledger_core::UserId;

    fn jwt(secret: &str) -> Hs256Jwt {
        Hs256Jwt::new(secret.as_bytes(), Duration::minutes(5), Duration::hours(24))
    }

    fn user() -> UserAccount {
        UserAccount {
            id: UserId::new(),
            username: "admin".to_string(),
            password_hash: PasswordHash::generate("secret"),
        }
    }

    #[test]
    fn issued_access_token_validates() {
        let jwt = jwt("k");
        let user = user();
        let now = Utc::now();
        let pair = jwt.issue_pair(&user, now).unwrap();

        let claims = jwt.validate(&pair.access, TokenKind::Access, now).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.expires_at, now + Duration::minutes(5));
    }

    #[test]
    fn refresh_token_cannot_be_used_as_access() {
        let jwt = jwt("k");
        let now = Utc::now();
        let pair = jwt.issue_pair(&user(), now).unwrap();

        let err = jwt.validate(&pair.refresh, TokenKind::Access, now).unwrap_err();
        assert!(matches!(err, TokenError::Claims(TokenValidationError::WrongKind { .. })));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let now = Utc::now();
        let token = jwt("one").issue(&user(), TokenKind::Access, now).unwrap();
        assert!(matches!(
            jwt("two").validate(&token, TokenKind::Access, now),
            Err(TokenError::Decode(_))
        ));
    }

    #[test]
    fn refresh_mints_new_access_token() {
        let jwt = jwt("k");
        let user = user();
        let issued = Utc::now();
        let pair = jwt.issue_pair(&user, issued).unwrap();

        let later = issued + Duration::minutes(10);
        assert!(jwt.validate(&pair.access, TokenKind::Access, later).is_err());

        let access = jwt.refresh_access(&pair.refresh, later).unwrap();
        let claims = jwt.validate(&access, TokenKind::Access, later).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[test]
    fn expired_refresh_token_is_rejected() {
        let jwt = jwt("k");
        let issued = Utc::now();
        let pair = jwt.issue_pair(&user(), issued).unwrap();

        let err = jwt
            .refresh_access(&pair.refresh, issued + Duration::hours(25))
            .unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }
}
