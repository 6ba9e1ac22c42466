//! Postgres-backed stock store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |----------------------|------------|----------|
//! | `23503` on insert | `UnknownProduct` | purchase/sale references a missing product |
//! | `23503` on delete | `Conflict` | product still referenced (`ON DELETE RESTRICT`) |
//! | `23505` | `Conflict` | duplicate primary key or username |
//! | Any other / pool / network | `Backend` | |
//!
//! ## Concurrency
//!
//! A sale transaction locks the product row with `SELECT .. FOR UPDATE`
//! before reading totals, so two admissions for the same product serialize
//! on that row while admissions for different products proceed in parallel.
//! Ledger reads run in a `REPEATABLE READ, READ ONLY` transaction so the
//! product, its purchases and its sales come from one snapshot.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockledger_core::{ProductId, PurchaseId, SalesId};
use stockledger_inventory::{Product, Purchase, Quantity, Sale, StockTotals};

use super::{LedgerSource, StockStore, StockTransaction, StoreError};

/// Idempotent bootstrap DDL.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    price       BIGINT NOT NULL CHECK (price >= 0),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS purchases (
    id             UUID PRIMARY KEY,
    product_id     UUID NOT NULL REFERENCES products (id) ON DELETE RESTRICT,
    quantity       BIGINT NOT NULL CHECK (quantity > 0),
    purchase_date  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS purchases_product_date_idx ON purchases (product_id, purchase_date);

CREATE TABLE IF NOT EXISTS sales (
    id          UUID PRIMARY KEY,
    product_id  UUID NOT NULL REFERENCES products (id) ON DELETE RESTRICT,
    quantity    BIGINT NOT NULL CHECK (quantity > 0),
    sales_date  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS sales_product_date_idx ON sales (product_id, sales_date);

CREATE TABLE IF NOT EXISTS users (
    id             UUID PRIMARY KEY,
    username       TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL
);
"#;

#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self), err)]
    pub async fn install_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("install_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StockStore for PostgresStockStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, name, price FROM products ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, name, price FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO products (id, name, price) VALUES ($1, $2, $3)")
            .bind(product.id.as_uuid())
            .bind(&product.name)
            .bind(price_to_db(product.price)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE products SET name = $2, price = $3 WHERE id = $1")
            .bind(product.id.as_uuid())
            .bind(&product.name)
            .bind(price_to_db(product.price)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::Conflict(format!("product {id} still has purchases or sales"))
                } else {
                    map_sqlx_error("delete_product", e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, purchase), fields(product_id = %purchase.product), err)]
    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO purchases (id, product_id, quantity, purchase_date) VALUES ($1, $2, $3, $4)")
            .bind(purchase.id.as_uuid())
            .bind(purchase.product.as_uuid())
            .bind(i64::from(purchase.quantity.get()))
            .bind(purchase.purchase_date)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::UnknownProduct(purchase.product)
                } else {
                    map_sqlx_error("insert_purchase", e)
                }
            })?;
        Ok(())
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, product_id, quantity, purchase_date FROM purchases ORDER BY purchase_date ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_purchases", e))?;
        collect_rows::<PurchaseRow, Purchase>(&rows)
    }

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        let rows = sqlx::query("SELECT id, product_id, quantity, sales_date FROM sales ORDER BY sales_date ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_sales", e))?;
        collect_rows::<SaleRow, Sale>(&rows)
    }

    async fn totals(&self, product: ProductId) -> Result<StockTotals, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("totals", e))?;
        totals_on(&mut conn, product).await
    }

    #[instrument(skip(self), fields(product_id = %product), err)]
    async fn ledger_source(&self, product: ProductId) -> Result<Option<LedgerSource>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("ledger_source", e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("ledger_source", e))?;

        let product_row = sqlx::query("SELECT id, name, price FROM products WHERE id = $1")
            .bind(product.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("ledger_source", e))?;
        let Some(product_row) = product_row else {
            return Ok(None);
        };
        let found = product_from_row(&product_row)?;

        let purchase_rows = sqlx::query(
            "SELECT id, product_id, quantity, purchase_date FROM purchases \
             WHERE product_id = $1 ORDER BY purchase_date ASC, id ASC",
        )
        .bind(product.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("ledger_source", e))?;

        let sale_rows = sqlx::query(
            "SELECT id, product_id, quantity, sales_date FROM sales \
             WHERE product_id = $1 ORDER BY sales_date ASC, id ASC",
        )
        .bind(product.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("ledger_source", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("ledger_source", e))?;

        Ok(Some(LedgerSource {
            product: found,
            purchases: collect_rows::<PurchaseRow, Purchase>(&purchase_rows)?,
            sales: collect_rows::<SaleRow, Sale>(&sale_rows)?,
        }))
    }

    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// Wraps a sqlx transaction; sqlx rolls it back when dropped uncommitted.
struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl StockTransaction for PostgresTransaction {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, name, price FROM products WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn totals(&mut self, product: ProductId) -> Result<StockTotals, StoreError> {
        totals_on(&mut self.tx, product).await
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sales (id, product_id, quantity, sales_date) VALUES ($1, $2, $3, $4)")
            .bind(sale.id.as_uuid())
            .bind(sale.product.as_uuid())
            .bind(i64::from(sale.quantity.get()))
            .bind(sale.sales_date)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::UnknownProduct(sale.product)
                } else {
                    map_sqlx_error("insert_sale", e)
                }
            })?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

async fn totals_on(conn: &mut sqlx::PgConnection, product: ProductId) -> Result<StockTotals, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM purchases WHERE product_id = $1) AS purchased,
            (SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM sales WHERE product_id = $1) AS sold
        "#,
    )
    .bind(product.as_uuid())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("totals", e))?;

    let purchased: i64 = row
        .try_get("purchased")
        .map_err(|e| map_sqlx_error("totals", e))?;
    let sold: i64 = row.try_get("sold").map_err(|e| map_sqlx_error("totals", e))?;

    Ok(StockTotals::new(non_negative("purchased", purchased)?, non_negative("sold", sold)?))
}

/// Map SQLx errors to `StoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // unique / foreign key violation
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23503";
        }
    }
    false
}

fn price_to_db(price: u64) -> Result<i64, StoreError> {
    i64::try_from(price).map_err(|_| StoreError::Backend(format!("price {price} does not fit BIGINT")))
}

fn non_negative(column: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Backend(format!("negative {column} value {value}")))
}

fn quantity_from_db(value: i64) -> Result<Quantity, StoreError> {
    u32::try_from(value)
        .ok()
        .and_then(|v| Quantity::new(v).ok())
        .ok_or_else(|| StoreError::Backend(format!("stored quantity {value} is out of range")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let row = ProductRow::from_row(row).map_err(|e| map_sqlx_error("decode product", e))?;
    Product::try_from(row)
}

fn collect_rows<R, T>(rows: &[PgRow]) -> Result<Vec<T>, StoreError>
where
    R: for<'r> FromRow<'r, PgRow>,
    T: TryFrom<R, Error = StoreError>,
{
    rows.iter()
        .map(|row| {
            let decoded = R::from_row(row).map_err(|e| map_sqlx_error("decode row", e))?;
            T::try_from(decoded)
        })
        .collect()
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: uuid::Uuid,
    name: String,
    price: i64,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            price: non_negative("price", row.price)?,
        })
    }
}

#[derive(Debug)]
struct PurchaseRow {
    id: uuid::Uuid,
    product_id: uuid::Uuid,
    quantity: i64,
    purchase_date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PurchaseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            purchase_date: row.try_get("purchase_date")?,
        })
    }
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = StoreError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        Ok(Purchase {
            id: PurchaseId::from_uuid(row.id),
            product: ProductId::from_uuid(row.product_id),
            quantity: quantity_from_db(row.quantity)?,
            purchase_date: row.purchase_date,
        })
    }
}

#[derive(Debug)]
struct SaleRow {
    id: uuid::Uuid,
    product_id: uuid::Uuid,
    quantity: i64,
    sales_date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SaleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            sales_date: row.try_get("sales_date")?,
        })
    }
}

impl TryFrom<SaleRow> for Sale {
    type Error = StoreError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(Sale {
            id: SalesId::from_uuid(row.id),
            product: ProductId::from_uuid(row.product_id),
            quantity: quantity_from_db(row.quantity)?,
            sales_date: row.sales_date,
        })
    }
}
