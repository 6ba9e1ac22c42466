use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, ProductId};

/// Maximum product name length (in characters, after trimming).
pub const MAX_NAME_LEN: usize = 100;

/// Largest accepted unit price; prices are persisted in a signed 64-bit column.
pub const MAX_PRICE: u64 = i64::MAX as u64;

/// Validated product attributes, used for both create and full update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    name: String,
    price: u64,
}

impl ProductDraft {
    /// Validate raw product attributes.
    ///
    /// `price` is the unit price in the smallest currency unit, so it is
    /// non-negative by construction.
    pub fn new(name: impl Into<String>, price: u64) -> DomainResult<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "name cannot be longer than {MAX_NAME_LEN} characters"
            )));
        }
        if price > MAX_PRICE {
            return Err(DomainError::validation(format!("price cannot exceed {MAX_PRICE}")));
        }
        Ok(Self {
            name: name.to_string(),
            price,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> u64 {
        self.price
    }
}

/// A sellable product with its current unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
}

impl Product {
    pub fn create(id: ProductId, draft: ProductDraft) -> Self {
        Self {
            id,
            name: draft.name,
            price: draft.price,
        }
    }

    /// Replace all mutable attributes (PUT semantics).
    pub fn update(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.price = draft.price;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
