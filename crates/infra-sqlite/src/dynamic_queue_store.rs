// SQLite DynamicQueueStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use dynaq_core::error::Result;
use dynaq_core::port::DynamicQueueStore;
use sqlx::SqlitePool;
use tracing::debug;

/// Registry entries in the `dynamic_queues` table
pub struct SqliteDynamicQueueStore {
    pool: SqlitePool,
}

impl SqliteDynamicQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DynamicQueueStore for SqliteDynamicQueueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM dynamic_queues WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dynamic_queues (key, value) VALUES (?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM dynamic_queues WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<(String, String)>> {
        sqlx::query_as::<_, (String, String)>("SELECT key, value FROM dynamic_queues ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn replace_all(&self, entries: &[(String, String)]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM dynamic_queues")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for (key, value) in entries {
            sqlx::query("INSERT INTO dynamic_queues (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(entries = entries.len(), "Dynamic queue registry replaced");
        Ok(())
    }
}
