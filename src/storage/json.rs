use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::models::{ProductId, ProductSnapshot, SnapshotMap};
use crate::storage::Storage;

/// Flat JSON file mapping product id to its last-seen snapshot.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Reads a snapshot file. Missing file is an empty snapshot, a corrupt one is
/// an error for the caller to decide on.
pub(crate) async fn read_snapshot_file(path: &Path) -> Result<SnapshotMap, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(SnapshotMap::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SnapshotMap::new()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Storage for JsonSnapshotStore {
    async fn load(&self) -> Result<SnapshotMap, StorageError> {
        match read_snapshot_file(&self.path).await {
            Ok(snapshots) => Ok(snapshots),
            Err(StorageError::Json(e)) => {
                // next save overwrites it
                warn!(path = %self.path.display(), "Snapshot file is corrupt, starting empty: {}", e);
                Ok(SnapshotMap::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, snapshots: &SnapshotMap) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(snapshots)?;
        let temp = self.temp_path();

        tokio::fs::write(&temp, content).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        info!(path = %self.path.display(), entries = snapshots.len(), "Saved snapshot file");
        Ok(())
    }

    async fn get(&self, id: &ProductId) -> Result<Option<ProductSnapshot>, StorageError> {
        Ok(self.load().await?.remove(id))
    }

    async fn upsert(&self, id: ProductId, snapshot: ProductSnapshot) -> Result<(), StorageError> {
        let mut snapshots = self.load().await?;
        snapshots.insert(id, snapshot);
        self.save(&snapshots).await
    }
}
