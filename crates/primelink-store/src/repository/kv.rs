//! # Key/Value Repository
//!
//! One row per storage key. Writes are upserts, so concurrent writers simply
//! replace each other (last write wins, same as browser local storage).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;

/// Repository over the `kv_store` table.
#[derive(Debug, Clone)]
pub struct KvRepository {
    pool: SqlitePool,
}

impl KvRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KvRepository { pool }
    }

    /// Reads the value stored under `key`.
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Inserts or replaces the value under `key`.
    pub async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(key = %key, bytes = value.len(), "Stored value");
        Ok(())
    }

    /// Deletes `key`. Returns true if a row was removed.
    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lists all keys, sorted.
    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM kv_store ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{SqliteStore, StoreConfig};

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let db = SqliteStore::new(StoreConfig::in_memory()).await.unwrap();
        let kv = db.kv();

        kv.put("b", "1").await.unwrap();
        kv.put("a", "2").await.unwrap();
        kv.put("b", "3").await.unwrap();

        assert_eq!(kv.keys().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(kv.get("b").await.unwrap().as_deref(), Some("3"));

        assert!(kv.delete("a").await.unwrap());
        assert!(!kv.delete("a").await.unwrap());
        assert_eq!(kv.get("a").await.unwrap(), None);
    }
}
