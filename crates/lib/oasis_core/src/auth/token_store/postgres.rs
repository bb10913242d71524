//! PostgreSQL-backed token store (`auth_tokens` table).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use sqlx::PgPool;

use super::{TokenStore, TokenStoreError};
use crate::auth::clock::{Clock, SystemClock};

/// [`TokenStore`] on the primary database.
pub struct PgTokenStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    /// Delete rows whose expiry has passed. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64, TokenStoreError> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= $1")
            .bind(self.clock.now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TokenStoreError> {
        sqlx::query(
            "INSERT INTO auth_tokens (key, value, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(self.clock.now() + ttl)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM auth_tokens WHERE key = $1 AND expires_at > $2",
        )
        .bind(key)
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), TokenStoreError> {
        sqlx::query("DELETE FROM auth_tokens WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_if(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, TokenStoreError> {
        let now = self.clock.now();
        let result = sqlx::query(
            "UPDATE auth_tokens SET value = $3, expires_at = $4 \
             WHERE key = $1 AND value = $2 AND expires_at > $5",
        )
        .bind(key)
        .bind(expected)
        .bind(value)
        .bind(now + ttl)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_if(&self, key: &str, expected: &str) -> Result<bool, TokenStoreError> {
        let result = sqlx::query(
            "DELETE FROM auth_tokens WHERE key = $1 AND value = $2 AND expires_at > $3",
        )
        .bind(key)
        .bind(expected)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
