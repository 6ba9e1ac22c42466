//! Stock movements: purchases (stock in) and sales (stock out).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, ProductId, PurchaseId, SalesId, ValueObject};

/// A strictly positive record quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl ValueObject for Quantity {}

impl TryFrom<u32> for Quantity {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl From<Quantity> for u64 {
    fn from(value: Quantity) -> Self {
        u64::from(value.0)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Validated purchase input, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    pub product: ProductId,
    pub quantity: Quantity,
    pub purchase_date: DateTime<Utc>,
}

impl NewPurchase {
    pub fn new(product: ProductId, quantity: u32, purchase_date: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            product,
            quantity: Quantity::new(quantity)?,
            purchase_date,
        })
    }
}

/// Validated sale input. Only committed when the admission check approves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub product: ProductId,
    pub quantity: Quantity,
    pub sales_date: DateTime<Utc>,
}

impl NewSale {
    pub fn new(product: ProductId, quantity: u32, sales_date: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            product,
            quantity: Quantity::new(quantity)?,
            sales_date,
        })
    }
}

/// A recorded stock receipt. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub product: ProductId,
    pub quantity: Quantity,
    pub purchase_date: DateTime<Utc>,
}

impl Purchase {
    pub fn record(id: PurchaseId, input: NewPurchase) -> Self {
        Self {
            id,
            product: input.product,
            quantity: input.quantity,
            purchase_date: input.purchase_date,
        }
    }
}

impl Entity for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SalesId,
    pub product: ProductId,
    pub quantity: Quantity,
    pub sales_date: DateTime<Utc>,
}

impl Sale {
    pub fn record(id: SalesId, input: NewSale) -> Self {
        Self {
            id,
            product: input.product,
            quantity: input.quantity,
            sales_date: input.sales_date,
        }
    }
}

impl Entity for Sale {
    type Id = SalesId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_is_rejected() {
        assert_eq!(
            Quantity::new(0).unwrap_err(),
            DomainError::validation("quantity must be positive")
        );
        assert!(NewSale::new(ProductId::new(), 0, Utc::now()).is_err());
        assert!(NewPurchase::new(ProductId::new(), 0, Utc::now()).is_err());
    }

    #[test]
    fn quantity_deserialization_validates() {
        let ok: Quantity = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert!(serde_json::from_str::<Quantity>("-1").is_err());
    }

    #[test]
    fn record_copies_validated_input() {
        let product = ProductId::new();
        let at = Utc::now();
        let id = SalesId::new();
        let sale = Sale::record(id, NewSale::new(product, 4, at).unwrap());

        assert_eq!(sale.id(), id);
        assert_eq!(sale.product, product);
        assert_eq!(sale.quantity.get(), 4);
        assert_eq!(sale.sales_date, at);
    }
}
