//! Inventory domain module.
//!
//! This crate contains the business rules for products, purchases and sales,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage): the stock admission check and the chronological ledger merge.

pub mod ledger;
pub mod movement;
pub mod product;
pub mod stock;

pub use ledger::{LedgerEntryKind, LedgerMerge, LedgerRow, merge_ledger};
pub use movement::{NewPurchase, NewSale, Purchase, Quantity, Sale};
pub use product::{MAX_NAME_LEN, MAX_PRICE, Product, ProductDraft};
pub use stock::{Admission, StockTotals, admit_quantity, admit_sale};
