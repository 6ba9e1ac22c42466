//! Login identity storage.

use std::collections::HashMap;

use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use stockledger_auth::{PasswordHash, UserAccount};
use stockledger_core::UserId;

use super::postgres::map_sqlx_error;
use super::{StoreError, UserDirectory};

/// Users keyed by username. Seeded at startup from configuration.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserAccount>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn upsert(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&account.username) {
            // Keep the existing id so issued tokens stay attributable.
            Some(existing) => existing.password_hash = account.password_hash.clone(),
            None => {
                users.insert(account.username.clone(), account.clone());
            }
        }
        Ok(())
    }
}

/// Users stored in the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let id: uuid::Uuid = row.try_get("id").map_err(|e| map_sqlx_error("find_user", e))?;
        let username: String = row.try_get("username").map_err(|e| map_sqlx_error("find_user", e))?;
        let encoded: String = row
            .try_get("password_hash")
            .map_err(|e| map_sqlx_error("find_user", e))?;
        let password_hash = PasswordHash::parse(&encoded).map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Some(UserAccount {
            id: UserId::from_uuid(id),
            username,
            password_hash,
        }))
    }

    async fn upsert(&self, account: &UserAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.username)
        .bind(account.password_hash.encode())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user", e))?;
        Ok(())
    }
}
