//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures such as validation
/// and stock rules. Storage and transport concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A sale would push cumulative sales above cumulative purchases.
    ///
    /// User-correctable: surface it as a rejected request, never as a crash.
    #[error("cannot exceed stock on hand: requested {requested}, available {available}")]
    StockExceeded { requested: u64, available: u64 },

    /// A record references a product that does not exist.
    #[error("unknown reference: {0}")]
    UnknownReference(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn stock_exceeded(requested: u64, available: u64) -> Self {
        Self::StockExceeded {
            requested,
            available,
        }
    }

    pub fn unknown_reference(msg: impl Into<String>) -> Self {
        Self::UnknownReference(msg.into())
    }
}
