//! Infrastructure layer: config, persistence, and the stock ledger service.

pub mod config;
pub mod service;
pub mod store;

pub use config::{AppConfig, ConfigError, CookieConfig, StoreBackend};
pub use service::{ServiceError, StockLedgerService};
pub use store::{
    InMemoryStockStore, InMemoryUserDirectory, LedgerSource, PostgresStockStore, PostgresUserDirectory, StockStore,
    StockTransaction, StoreError, UserDirectory,
};
