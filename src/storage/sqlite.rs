use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::error::StorageError;
use crate::models::{Price, ProductId, ProductSnapshot, SnapshotMap};
use crate::storage::json::read_snapshot_file;
use crate::storage::Storage;

pub struct SqliteSnapshotStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSnapshotStore {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Seed the table from an existing JSON snapshot file. Rows already
    /// present win over the file, so importing again on every start is a no-op
    /// for products the scanner has since updated.
    pub async fn import_from_json(&self, json_path: impl AsRef<Path>) -> Result<(), StorageError> {
        let json_path = json_path.as_ref();
        if !json_path.exists() {
            info!("No existing JSON snapshot to import");
            return Ok(());
        }

        let snapshots = read_snapshot_file(json_path).await?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut imported = 0;
        for (id, snapshot) in &snapshots {
            imported += insert_missing_row(&tx, id, snapshot)?;
        }
        tx.commit()?;

        info!(
            "Imported {} of {} snapshots from {}",
            imported,
            snapshots.len(),
            json_path.display()
        );
        Ok(())
    }
}

fn upsert_row(conn: &Connection, id: &ProductId, snapshot: &ProductSnapshot) -> rusqlite::Result<usize> {
    write_row(conn, "INSERT OR REPLACE", id, snapshot)
}

fn insert_missing_row(conn: &Connection, id: &ProductId, snapshot: &ProductSnapshot) -> rusqlite::Result<usize> {
    write_row(conn, "INSERT OR IGNORE", id, snapshot)
}

fn write_row(
    conn: &Connection,
    verb: &str,
    id: &ProductId,
    snapshot: &ProductSnapshot,
) -> rusqlite::Result<usize> {
    conn.execute(
        &format!(
            "{} INTO product_snapshots
                (product_id, name, price, image_url, link_url, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            verb
        ),
        params![
            &id.0,
            &snapshot.name,
            &snapshot.price.0,
            &snapshot.image_url,
            &snapshot.link_url,
            &snapshot.last_seen,
        ],
    )
}

fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<(ProductId, ProductSnapshot)> {
    let last_seen: DateTime<Utc> = row.get(5)?;
    Ok((
        ProductId(row.get(0)?),
        ProductSnapshot {
            name: row.get(1)?,
            price: Price(row.get(2)?),
            image_url: row.get(3)?,
            link_url: row.get(4)?,
            last_seen,
        },
    ))
}

const SELECT_COLUMNS: &str = "SELECT product_id, name, price, image_url, link_url, last_seen FROM product_snapshots";

#[async_trait]
impl Storage for SqliteSnapshotStore {
    async fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS product_snapshots (
                product_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                price TEXT NOT NULL,
                image_url TEXT,
                link_url TEXT,
                last_seen DATETIME NOT NULL
            )",
            [],
        )?;

        info!("Database migration completed");
        Ok(())
    }

    async fn load(&self) -> Result<SnapshotMap, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(SELECT_COLUMNS)?;
        let rows = stmt.query_map([], row_to_snapshot)?;

        let mut snapshots = SnapshotMap::new();
        for row in rows {
            let (id, snapshot) = row?;
            snapshots.insert(id, snapshot);
        }
        Ok(snapshots)
    }

    async fn save(&self, snapshots: &SnapshotMap) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM product_snapshots", [])?;
        for (id, snapshot) in snapshots {
            upsert_row(&tx, id, snapshot)?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn get(&self, id: &ProductId) -> Result<Option<ProductSnapshot>, StorageError> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                &format!("{} WHERE product_id = ?1", SELECT_COLUMNS),
                params![&id.0],
                row_to_snapshot,
            )
            .optional()?;

        Ok(row.map(|(_, snapshot)| snapshot))
    }

    async fn upsert(&self, id: ProductId, snapshot: ProductSnapshot) -> Result<(), StorageError> {
        let conn = self.lock()?;
        upsert_row(&conn, &id, &snapshot)?;
        Ok(())
    }
}
