//! Plugin configuration store.
//!
//! DESIGN
//! ======
//! A flat key/value association partitioned by plugin namespace, the way
//! the host platform keeps per-plugin settings. Every write is a single
//! upsert of one `(plugin, name)` row, so concurrent writers to the same key
//! resolve last-write-wins and a reader never sees a partial value.
//!
//! Two backends: Postgres for deployment, and an in-memory map for tests and
//! database-less development runs.

use std::collections::HashMap;

use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Key/value storage scoped by plugin namespace. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read a raw value. `None` when nothing was ever written under the key.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    async fn get(&self, plugin: &str, name: &str) -> Result<Option<String>, StoreError>;

    /// Write a raw value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend rejects the write.
    async fn set(&self, plugin: &str, name: &str, value: &str) -> Result<(), StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConfigStore for PgConfigStore {
    async fn get(&self, plugin: &str, name: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM config_plugins WHERE plugin = $1 AND name = $2")
            .bind(plugin)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, plugin: &str, name: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO config_plugins (plugin, name, value) VALUES ($1, $2, $3)
             ON CONFLICT (plugin, name) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(plugin)
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

#[derive(Default)]
pub struct MemoryConfigStore {
    values: RwLock<HashMap<(String, String), String>>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, plugin: &str, name: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().await;
        Ok(values.get(&(plugin.to_owned(), name.to_owned())).cloned())
    }

    async fn set(&self, plugin: &str, name: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        values.insert((plugin.to_owned(), name.to_owned()), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
