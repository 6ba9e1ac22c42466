//! Username/password verification.
//!
//! Password hashes are stored as `sha256$<salt-hex>$<digest-hex>` where the
//! digest is `SHA-256(salt || password)`.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use stockledger_core::UserId;

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// Unknown user or wrong password. Deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("malformed password hash: {0}")]
    MalformedHash(String),
}

/// Login request payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A salted password digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl PasswordHash {
    /// Hash a password with a fresh random salt.
    pub fn generate(password: &str) -> Self {
        let salt: [u8; SALT_LEN] = rand::random();
        Self::with_salt(password, salt.to_vec())
    }

    fn with_salt(password: &str, salt: Vec<u8>) -> Self {
        let digest = digest(&salt, password);
        Self { salt, digest }
    }

    pub fn parse(encoded: &str) -> Result<Self, CredentialsError> {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(salt), Some(digest), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialsError::MalformedHash("expected three '$'-separated parts".into()));
        };
        if scheme != SCHEME {
            return Err(CredentialsError::MalformedHash(format!("unsupported scheme '{scheme}'")));
        }
        let salt = hex::decode(salt).map_err(|e| CredentialsError::MalformedHash(e.to_string()))?;
        let digest = hex::decode(digest).map_err(|e| CredentialsError::MalformedHash(e.to_string()))?;
        Ok(Self { salt, digest })
    }

    /// Constant-time comparison of `password` against the stored digest.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.salt, password);
        if candidate.len() != self.digest.len() {
            return false;
        }
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    pub fn encode(&self) -> String {
        format!("{SCHEME}${}${}", hex::encode(&self.salt), hex::encode(&self.digest))
    }
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// A stored login identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub password_hash: PasswordHash,
}

impl UserAccount {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            password_hash: PasswordHash::generate(password),
        }
    }
}

/// Check a password against the account looked up for the submitted username.
pub fn verify_credentials(
    account: Option<UserAccount>,
    credentials: &Credentials,
) -> Result<UserAccount, CredentialsError> {
    match account {
        Some(account)
            if account.username == credentials.username
                && account.password_hash.verify(&credentials.password) =>
        {
            Ok(account)
        }
        _ => {
            tracing::debug!(username = %credentials.username, "credential check failed");
            Err(CredentialsError::InvalidCredentials)
        }
    }
}
