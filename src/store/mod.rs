//! Persistence for reading state
//!
//! Everything is stored as JSON strings under namespaced keys in a [`KeyValueStore`]:
//! - `bookmark_<series>` holds the saved positions of every book in a series
//! - `progress_<series>` holds per-book progress records
//! - `read_<series>` holds the books marked as read
//!
//! Two backends are provided: [`MemoryStore`] and the sqlx-backed [`SqliteStore`].

mod position;
mod sqlite;


pub use position::{
    Position, ProgressRecord, ReadingPosition, ReadingPositionStore, ReadingState,
    SharedReadingState,
};
pub use sqlite::SqliteStore;

use crate::config::PersistenceConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// String key-value persistence
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; missing keys are not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store; contents are lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Open the store selected by the persistence config
///
/// Uses SQLite when `database_path` is set, otherwise an in-memory store.
pub async fn open_store(config: &PersistenceConfig) -> Result<Arc<dyn KeyValueStore>> {
    match &config.database_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening sqlite key-value store");
            Ok(Arc::new(SqliteStore::new(path).await?))
        }
        None => {
            tracing::debug!("using in-memory key-value store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
