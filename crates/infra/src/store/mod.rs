//! Stock ledger persistence.
//!
//! The store owns the product, purchase and sales collections. Everything that
//! must be atomic with the admission check goes through a [`StockTransaction`]
//! obtained from [`StockStore::begin`]; dropping a transaction without calling
//! `commit` discards its writes.

use thiserror::Error;

use stockledger_auth::UserAccount;
use stockledger_core::ProductId;
use stockledger_inventory::{Product, Purchase, Sale, StockTotals};

pub mod in_memory;
pub mod postgres;
pub mod users;

pub use in_memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
pub use users::{InMemoryUserDirectory, PostgresUserDirectory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A purchase or sale referenced a product that does not exist.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    /// A write was refused by a referential or uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Everything the ledger merge needs for one product, read from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSource {
    pub product: Product,
    pub purchases: Vec<Purchase>,
    pub sales: Vec<Sale>,
}

#[async_trait::async_trait]
pub trait StockStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Returns `false` when no product with that id exists.
    async fn update_product(&self, product: &Product) -> Result<bool, StoreError>;

    /// Returns `false` when no product with that id exists; fails with
    /// [`StoreError::Conflict`] while purchases or sales still reference it.
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError>;

    async fn list_purchases(&self) -> Result<Vec<Purchase>, StoreError>;

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError>;

    /// Cumulative purchased and sold quantities. Unknown products are `(0, 0)`.
    async fn totals(&self, product: ProductId) -> Result<StockTotals, StoreError>;

    /// Product plus its purchases and sales, each sorted by date then id.
    ///
    /// `None` when the product does not exist.
    async fn ledger_source(&self, product: ProductId) -> Result<Option<LedgerSource>, StoreError>;

    /// Open an exclusive unit of work for a check-then-insert sequence.
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError>;
}

/// A unit of work opened by [`StockStore::begin`].
#[async_trait::async_trait]
pub trait StockTransaction: Send {
    /// Take the product's write lock for the rest of the transaction.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Totals as seen inside the transaction (includes its own uncommitted writes).
    async fn totals(&mut self, product: ProductId) -> Result<StockTotals, StoreError>;

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Lookup of login identities.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Insert the account, or replace the password of an existing username.
    async fn upsert(&self, account: &UserAccount) -> Result<(), StoreError>;
}

/// Sort key shared by both backends for `ledger_source` and list ordering.
pub(crate) fn sort_purchases(purchases: &mut [Purchase]) {
    purchases.sort_by(|a, b| (a.purchase_date, a.id).cmp(&(b.purchase_date, b.id)));
}

pub(crate) fn sort_sales(sales: &mut [Sale]) {
    sales.sort_by(|a, b| (a.sales_date, a.id).cmp(&(b.sales_date, b.id)));
}
