//! Application service over the stock store.
//!
//! Owns the check-then-insert sequence for sales: the admission check and the
//! insert run inside one store transaction, so concurrent sales for the same
//! product cannot both pass the check against the same totals.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use stockledger_core::{DomainError, ProductId, PurchaseId, SalesId};
use stockledger_inventory::{
    LedgerMerge, LedgerRow, NewPurchase, NewSale, Product, ProductDraft, Purchase, Sale, StockTotals, admit_sale, merge_ledger,
};

use crate::store::{StockStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct StockLedgerService {
    store: Arc<dyn StockStore>,
}

impl core::fmt::Debug for StockLedgerService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockLedgerService").finish_non_exhaustive()
    }
}

impl StockLedgerService {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products().await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    #[instrument(skip(self, draft), fields(name = %draft.name()), err)]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, ServiceError> {
        let product = Product::create(ProductId::new(), draft);
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, draft), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product, ServiceError> {
        let mut product = self.get_product(id).await?;
        product.update(draft);
        if !self.store.update_product(&product).await? {
            return Err(DomainError::not_found().into());
        }
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        if !self.store.delete_product(id).await? {
            return Err(DomainError::not_found().into());
        }
        info!("product deleted");
        Ok(())
    }

    #[instrument(skip(self, input), fields(product_id = %input.product, quantity = %input.quantity), err)]
    pub async fn record_purchase(&self, input: NewPurchase) -> Result<Purchase, ServiceError> {
        let purchase = Purchase::record(PurchaseId::new(), input);
        self.store.insert_purchase(&purchase).await?;
        info!(purchase_id = %purchase.id, "purchase recorded");
        Ok(purchase)
    }

    pub async fn list_purchases(&self) -> Result<Vec<Purchase>, ServiceError> {
        Ok(self.store.list_purchases().await?)
    }

    pub async fn list_sales(&self) -> Result<Vec<Sale>, ServiceError> {
        Ok(self.store.list_sales().await?)
    }

    /// Cumulative purchased/sold quantities; `(0, 0)` for unknown products.
    pub async fn stock_totals(&self, product: ProductId) -> Result<StockTotals, ServiceError> {
        Ok(self.store.totals(product).await?)
    }

    /// Run the admission check and, when approved, insert and commit the sale.
    ///
    /// Rejections return [`DomainError::StockExceeded`] and leave the store
    /// untouched. An unknown product has zero totals, so any sale against it
    /// is rejected the same way.
    #[instrument(skip(self, input), fields(product_id = %input.product, quantity = %input.quantity), err)]
    pub async fn check_and_admit(&self, input: NewSale) -> Result<Sale, ServiceError> {
        let mut tx = self.store.begin().await?;
        tx.lock_product(input.product).await?;
        let totals = tx.totals(input.product).await?;

        let admission = match admit_sale(totals, input.quantity) {
            Ok(admission) => admission,
            Err(err) => {
                warn!(
                    purchased = totals.purchased,
                    sold = totals.sold,
                    "sale rejected: {err}"
                );
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback after rejected sale failed");
                }
                return Err(err.into());
            }
        };

        let sale = Sale::record(SalesId::new(), input);
        tx.insert_sale(&sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            projected_sold = admission.projected_sold,
            remaining = admission.remaining,
            "sale admitted"
        );
        Ok(sale)
    }

    /// Chronological purchase/sale rows for one product, priced at the
    /// product's current unit price. Empty for unknown products.
    #[instrument(skip(self), fields(product_id = %product), err)]
    pub async fn ledger(&self, product: ProductId) -> Result<Vec<LedgerRow>, ServiceError> {
        let rows = match self.store.ledger_source(product).await? {
            Some(source) => merge_ledger(source.purchases, source.sales, source.product.price),
            None => LedgerMerge::empty(),
        };
        Ok(rows.collect())
    }
}
