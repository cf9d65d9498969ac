use chrono::Utc;
use pretty_assertions::assert_eq;

use product_bot::config::{StorageBackend, StorageConfig};
use product_bot::models::{Price, ProductId, ProductSnapshot};
use product_bot::storage;

fn sqlite_config(dir: &tempfile::TempDir) -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::Sqlite,
        path: Some(dir.path().join("products.db")),
        import_json: Some(dir.path().join("data.json")),
    }
}

#[tokio::test]
async fn sqlite_import_runs_once_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("data.json"),
        r#"{"https://shop.test/a": {"name": "A", "price": "10", "image_url": null, "link_url": "https://shop.test/a"}}"#,
    )
    .unwrap();

    let config = sqlite_config(&dir);
    let id = ProductId("https://shop.test/a".into());

    let store = storage::open(&config).await.unwrap();
    let mut snapshots = store.load().await.unwrap();
    assert_eq!(snapshots[&id].price, Price::new("10"));

    snapshots.insert(
        id.clone(),
        ProductSnapshot {
            name: "A".to_string(),
            price: Price::new("8"),
            image_url: None,
            link_url: Some("https://shop.test/a".to_string()),
            last_seen: Utc::now(),
        },
    );
    store.save(&snapshots).await.unwrap();
    drop(store);

    let reopened = storage::open(&config).await.unwrap();
    assert_eq!(reopened.get(&id).await.unwrap().unwrap().price, Price::new("8"));
    assert_eq!(reopened.load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_backend_defaults_to_its_own_file() {
    let config = StorageConfig {
        backend: StorageBackend::Sqlite,
        ..StorageConfig::default()
    };
    assert_eq!(config.path(), std::path::PathBuf::from("products.db"));
}
