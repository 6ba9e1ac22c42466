//! Service wiring: store backend, user directory, token signer.

use std::sync::Arc;

use anyhow::Context;

use stockledger_auth::{Hs256Jwt, UserAccount};
use stockledger_infra::{
    AppConfig, CookieConfig, InMemoryStockStore, InMemoryUserDirectory, PostgresStockStore, PostgresUserDirectory,
    StockLedgerService, StoreBackend, UserDirectory,
};

/// Everything the handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub stock: StockLedgerService,
    pub users: Arc<dyn UserDirectory>,
    pub jwt: Arc<Hs256Jwt>,
    pub cookie: CookieConfig,
}

impl AppServices {
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let services = match &config.store {
            StoreBackend::InMemory => {
                tracing::info!("using in-memory stores");
                build_in_memory_services(config)
            }
            StoreBackend::Postgres { url, max_connections } => {
                tracing::info!(max_connections, "using postgres stores");
                build_postgres_services(config, url, *max_connections).await?
            }
        };

        seed_admin(config, services.users.as_ref()).await?;
        Ok(services)
    }
}

fn jwt_from_config(config: &AppConfig) -> Arc<Hs256Jwt> {
    Arc::new(Hs256Jwt::new(
        config.jwt_secret.as_bytes(),
        config.access_token_ttl,
        config.refresh_token_ttl,
    ))
}

fn build_in_memory_services(config: &AppConfig) -> AppServices {
    AppServices {
        stock: StockLedgerService::new(Arc::new(InMemoryStockStore::new())),
        users: Arc::new(InMemoryUserDirectory::new()),
        jwt: jwt_from_config(config),
        cookie: config.cookie.clone(),
    }
}

async fn build_postgres_services(config: &AppConfig, url: &str, max_connections: u32) -> anyhow::Result<AppServices> {
    let store = PostgresStockStore::connect(url, max_connections)
        .await
        .context("failed to connect to postgres")?;
    store.install_schema().await.context("failed to install schema")?;

    let users = PostgresUserDirectory::new(store.pool().clone());

    Ok(AppServices {
        stock: StockLedgerService::new(Arc::new(store)),
        users: Arc::new(users),
        jwt: jwt_from_config(config),
        cookie: config.cookie.clone(),
    })
}

async fn seed_admin(config: &AppConfig, users: &dyn UserDirectory) -> anyhow::Result<()> {
    let Some(password) = config.admin_password.as_deref() else {
        tracing::warn!(
            username = %config.admin_username,
            "ADMIN_PASSWORD not set; no login account seeded"
        );
        return Ok(());
    };

    users
        .upsert(&UserAccount::new(config.admin_username.clone(), password))
        .await
        .context("failed to seed admin account")?;
    tracing::info!(username = %config.admin_username, "admin account seeded");
    Ok(())
}
