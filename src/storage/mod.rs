use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageError;
use crate::models::{ProductId, ProductSnapshot, SnapshotMap};

mod json;
mod sqlite;
pub use json::JsonSnapshotStore;
pub use sqlite::SqliteSnapshotStore;

/// Last-seen product snapshots, read whole and written whole.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn migrate(&self) -> Result<(), StorageError> {
        Ok(())
    }
    async fn load(&self) -> Result<SnapshotMap, StorageError>;
    async fn save(&self, snapshots: &SnapshotMap) -> Result<(), StorageError>;
    async fn get(&self, id: &ProductId) -> Result<Option<ProductSnapshot>, StorageError>;
    async fn upsert(&self, id: ProductId, snapshot: ProductSnapshot) -> Result<(), StorageError>;
}

pub async fn open(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    let path = config.path();
    match config.backend {
        StorageBackend::Json => {
            info!(path = %path.display(), "Using JSON snapshot file");
            Ok(Arc::new(JsonSnapshotStore::new(&path)))
        }
        StorageBackend::Sqlite => {
            info!(path = %path.display(), "Using SQLite snapshot database");
            let store = SqliteSnapshotStore::new(&path).await?;
            store.migrate().await?;
            if let Some(json_path) = &config.import_json {
                store.import_from_json(json_path).await?;
            }
            Ok(Arc::new(store))
        }
    }
}
