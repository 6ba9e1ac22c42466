use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::instrument;

use stockledger_core::{ProductId, contains_id};
use stockledger_inventory::{Product, Purchase, Sale, StockTotals};

use super::{LedgerSource, StockStore, StockTransaction, StoreError, sort_purchases, sort_sales};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    purchases: Vec<Purchase>,
    sales: Vec<Sale>,
}

impl Tables {
    fn totals(&self, product: ProductId) -> StockTotals {
        StockTotals::from_records(
            self.purchases.iter().filter(|p| p.product == product),
            self.sales.iter().filter(|s| s.product == product),
        )
    }

    fn is_referenced(&self, product: ProductId) -> bool {
        self.purchases.iter().any(|p| p.product == product) || self.sales.iter().any(|s| s.product == product)
    }
}

/// In-memory stock store.
///
/// Intended for tests/dev. Transactions hold the write lock for their whole
/// lifetime, so check-then-insert sequences are fully serialized.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StockStore for InMemoryStockStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
        }
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Ok(false);
        }
        if tables.is_referenced(id) {
            return Err(StoreError::Conflict(format!(
                "product {id} still has purchases or sales"
            )));
        }
        tables.products.remove(&id);
        Ok(true)
    }

    #[instrument(skip(self, purchase), fields(product_id = %purchase.product))]
    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&purchase.product) {
            return Err(StoreError::UnknownProduct(purchase.product));
        }
        if contains_id(&tables.purchases, purchase.id) {
            return Err(StoreError::Conflict(format!("purchase {} already exists", purchase.id)));
        }
        tables.purchases.push(purchase.clone());
        Ok(())
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>, StoreError> {
        let mut purchases = self.tables.read().await.purchases.clone();
        sort_purchases(&mut purchases);
        Ok(purchases)
    }

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        let mut sales = self.tables.read().await.sales.clone();
        sort_sales(&mut sales);
        Ok(sales)
    }

    async fn totals(&self, product: ProductId) -> Result<StockTotals, StoreError> {
        Ok(self.tables.read().await.totals(product))
    }

    async fn ledger_source(&self, product: ProductId) -> Result<Option<LedgerSource>, StoreError> {
        let tables = self.tables.read().await;
        let Some(found) = tables.products.get(&product) else {
            return Ok(None);
        };

        let mut purchases: Vec<Purchase> =
            tables.purchases.iter().filter(|p| p.product == product).cloned().collect();
        let mut sales: Vec<Sale> = tables.sales.iter().filter(|s| s.product == product).cloned().collect();
        sort_purchases(&mut purchases);
        sort_sales(&mut sales);

        Ok(Some(LedgerSource {
            product: found.clone(),
            purchases,
            sales,
        }))
    }

    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        let guard = Arc::clone(&self.tables).write_owned().await;
        Ok(Box::new(InMemoryTransaction {
            tables: guard,
            staged_sales: Vec::new(),
        }))
    }
}

/// Exclusive transaction over the in-memory tables.
///
/// Writes are staged and only applied on `commit`.
struct InMemoryTransaction {
    tables: OwnedRwLockWriteGuard<Tables>,
    staged_sales: Vec<Sale>,
}

#[async_trait::async_trait]
impl StockTransaction for InMemoryTransaction {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.products.get(&id).cloned())
    }

    async fn totals(&mut self, product: ProductId) -> Result<StockTotals, StoreError> {
        let committed = self.tables.totals(product);
        let staged = StockTotals::from_records(
            core::iter::empty(),
            self.staged_sales.iter().filter(|s| s.product == product),
        );
        Ok(StockTotals::new(
            committed.purchased,
            committed.sold.saturating_add(staged.sold),
        ))
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        if !self.tables.products.contains_key(&sale.product) {
            return Err(StoreError::UnknownProduct(sale.product));
        }
        if contains_id(&self.tables.sales, sale.id) || contains_id(&self.staged_sales, sale.id) {
            return Err(StoreError::Conflict(format!("sale {} already exists", sale.id)));
        }
        self.staged_sales.push(sale.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction {
            mut tables,
            staged_sales,
        } = *self;
        tables.sales.extend(staged_sales);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
