//! `stockledger-auth`: authentication boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it verifies
//! credentials handed to it and mints/validates signed tokens.

pub mod claims;
pub mod credentials;
pub mod token;

pub use claims::{JwtClaims, TokenKind, TokenValidationError, validate_claims};
pub use credentials::{Credentials, CredentialsError, PasswordHash, UserAccount, verify_credentials};
pub use token::{Hs256Jwt, JwtIssuer, JwtValidator, TokenError, TokenPair};
