//! Local fallback store
//!
//! Durable, namespaced key-value persistence used whenever the remote
//! backend is unavailable. Keys follow `<prefix>_<entity>_<ownerId>` and
//! values are JSON text.
//!
//! Reads never fail: a missing key, a database error or a malformed value
//! all read as "absent". Writes never fail either; errors are logged and the
//! previous value stays in place.

use crate::config::APP_PREFIX;
use crate::error::Result;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt::Display;

/// Namespaced JSON key-value store over SQLite
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    prefix: String,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            prefix: APP_PREFIX.to_string(),
        }
    }

    /// Key for an entity owned by a user or goal: `<prefix>_<entity>_<owner>`
    pub fn key(&self, entity: &str, owner: impl Display) -> String {
        format!("{}_{}_{}", self.prefix, entity, owner)
    }

    /// Key for an application-wide slot: `<prefix>_<entity>`
    pub fn global_key(&self, entity: &str) -> String {
        format!("{}_{}", self.prefix, entity)
    }

    /// Raw stored text for a key
    pub async fn read_raw(&self, key: &str) -> Option<String> {
        let result: std::result::Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await;

        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Local store read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.read_raw(key).await.is_some()
    }

    /// Decode the value under `key`; malformed JSON reads as absent
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key).await?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding malformed local value for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.read(key).await.unwrap_or_default()
    }

    /// Serialize and store `value` under `key`
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize local value for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.write_raw(key, &json).await {
            tracing::error!("Local store write failed for {}: {}", key, e);
        }
    }

    pub async fn remove(&self, key: &str) {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            tracing::error!("Local store delete failed for {}: {}", key, e);
        }
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn write_raw(&self, key: &str, json: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Wrote local value: {}", key);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::schema::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    pub(crate) async fn create_test_store() -> LocalStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        LocalStore::new(pool)
    }

    #[tokio::test]
    async fn test_key_format() {
        let store = create_test_store().await;

        assert_eq!(store.key("goals", 42), "goalTracker_goals_42");
        assert_eq!(store.global_key("user"), "goalTracker_user");
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let store = create_test_store().await;
        let key = store.key("numbers", 1);

        store.write(&key, &vec![1, 2, 3]).await;
        let value: Option<Vec<i32>> = store.read(&key).await;
        assert_eq!(value, Some(vec![1, 2, 3]));

        // Overwrite existing
        store.write(&key, &vec![4]).await;
        let value: Vec<i32> = store.read_or_default(&key).await;
        assert_eq!(value, vec![4]);
    }

    #[tokio::test]
    async fn test_malformed_value_reads_as_absent() {
        let store = create_test_store().await;
        let key = store.key("goals", 7);

        sqlx::query("INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(&key)
            .bind("[{broken")
            .bind("2024-01-01T00:00:00Z")
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(store.exists(&key).await);
        let value: Option<Vec<i32>> = store.read(&key).await;
        assert!(value.is_none());
        let fallback: Vec<i32> = store.read_or_default(&key).await;
        assert!(fallback.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = create_test_store().await;
        let key = store.global_key("theme");

        store.write(&key, "dark").await;
        assert!(store.exists(&key).await);

        store.remove(&key).await;
        assert!(!store.exists(&key).await);
        assert!(store.read::<String>(&key).await.is_none());
    }
}
