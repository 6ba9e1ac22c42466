//! `stockledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod model;

pub use error::{DomainError, DomainResult};
pub use id::{ProductId, PurchaseId, SalesId, UserId};
pub use model::{Entity, ValueObject, contains_id};
