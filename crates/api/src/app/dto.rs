//! Request DTOs and their conversion into validated domain inputs.
//!
//! Numbers are accepted as signed integers so that negative or zero values
//! surface as validation errors rather than body rejections.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use stockledger_core::{DomainError, DomainResult, ProductId};
use stockledger_inventory::{NewPurchase, NewSale, ProductDraft};

use crate::app::errors;

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: i64,
}

impl ProductRequest {
    pub fn into_draft(self) -> DomainResult<ProductDraft> {
        let price = u64::try_from(self.price).map_err(|_| DomainError::validation("price cannot be negative"))?;
        ProductDraft::new(self.name, price)
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub product: String,
    pub quantity: i64,
    pub purchase_date: Option<DateTime<Utc>>,
}

impl PurchaseRequest {
    pub fn into_input(self, now: DateTime<Utc>) -> DomainResult<NewPurchase> {
        NewPurchase::new(
            self.product.parse()?,
            quantity(self.quantity)?,
            self.purchase_date.unwrap_or(now),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SaleRequest {
    pub product: String,
    pub quantity: i64,
    pub sales_date: Option<DateTime<Utc>>,
}

impl SaleRequest {
    pub fn into_input(self, now: DateTime<Utc>) -> DomainResult<NewSale> {
        NewSale::new(
            self.product.parse()?,
            quantity(self.quantity)?,
            self.sales_date.unwrap_or(now),
        )
    }
}

fn quantity(raw: i64) -> DomainResult<u32> {
    if raw <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    u32::try_from(raw).map_err(|_| DomainError::validation("quantity is too large"))
}

pub fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_quantity_is_reported_as_too_large() {
        let sale = SaleRequest {
            product: ProductId::new().to_string(),
            quantity: 5_000_000_000,
            sales_date: None,
        };
        assert_eq!(
            sale.into_input(Utc::now()),
            Err(DomainError::validation("quantity is too large"))
        );
        assert_eq!(quantity(0), Err(DomainError::validation("quantity must be positive")));
        assert_eq!(quantity(i64::from(u32::MAX)), Ok(u32::MAX));
    }

    #[test]
    fn negative_numbers_are_validation_errors() {
        let product = ProductRequest {
            name: "Widget".into(),
            price: -1,
        };
        assert!(matches!(product.into_draft(), Err(DomainError::Validation(_))));

        let sale = SaleRequest {
            product: ProductId::new().to_string(),
            quantity: -3,
            sales_date: None,
        };
        assert!(matches!(sale.into_input(Utc::now()), Err(DomainError::Validation(_))));
    }

    #[test]
    fn missing_date_defaults_to_now() {
        let now = Utc::now();
        let purchase = PurchaseRequest {
            product: ProductId::new().to_string(),
            quantity: 2,
            purchase_date: None,
        }
        .into_input(now)
        .unwrap();
        assert_eq!(purchase.purchase_date, now);
        assert_eq!(purchase.quantity.get(), 2);
    }

    #[test]
    fn malformed_product_id_is_rejected() {
        let sale = SaleRequest {
            product: "not-a-uuid".into(),
            quantity: 1,
            sales_date: None,
        };
        assert!(matches!(sale.into_input(Utc::now()), Err(DomainError::InvalidId(_))));
    }
}
