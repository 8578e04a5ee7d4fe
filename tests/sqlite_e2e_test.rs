// ==========================================
// SQLite 端到端测试
// ==========================================
// 测试目标: 导入 → 批量写入 → 重新加载 → 单元格编辑 → 批量删除
// ==========================================


use catalog_sync::api::{ApiError, CatalogApi, SelectedRow};
use catalog_sync::config::{config_keys, ConfigManager, SyncConfig};
use catalog_sync::domain::ProductStatus;
use catalog_sync::logging;
use catalog_sync::repository::{ProductStore, SqliteProductStore};
use catalog_sync::sync::RecordingRowSink;
use std::sync::Arc;
use test_helpers::{create_test_db, write_import_file, SHIRT_CSV};

fn create_api(db_path: &str) -> (CatalogApi<SqliteProductStore>, RecordingRowSink) {
    let config = SyncConfig {
        db_path: db_path.to_string(),
        ..SyncConfig::default()
    };
    let store = Arc::new(SqliteProductStore::new(db_path).expect("Failed to open store"));
    let sink = RecordingRowSink::new();
    let api = CatalogApi::new(store, Arc::new(sink.clone()), &config);
    (api, sink)
}

#[tokio::test]
async fn test_import_sync_and_reload() {
    logging::init_test();

    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let (api, sink) = create_api(&db_path);
    let file = write_import_file(".csv", SHIRT_CSV).expect("Failed to write import file");

    let (outcome, bulk) = api
        .import_and_sync(file.path())
        .await
        .expect("Import and sync should succeed");
    assert_eq!(bulk.total, 4);
    assert_eq!(bulk.committed, 4);
    assert_eq!(bulk.chunks, 1);

    // 新开一个适配器，确认数据已落库
    let (reloaded_api, _) = create_api(&db_path);
    let loaded = reloaded_api.load().await.expect("Load should succeed");
    assert_eq!(loaded.forest, outcome.forest);
    assert!(loaded.orphans.is_empty());
    assert!(sink.latest().is_some());
}

#[tokio::test]
async fn test_edit_and_mass_delete_against_sqlite() {
    logging::init_test();

    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _sink) = create_api(&db_path);
    let outcome = api
        .import_csv_text(SHIRT_CSV)
        .expect("Import should succeed");
    api.bulk_replace(&outcome.forest)
        .await
        .expect("Bulk replace should succeed");

    let shirt = outcome.forest[0].clone();
    let child = SelectedRow {
        node: shirt.children[1].clone(),
        parent_id: Some(shirt.id.clone()),
    };

    // 非法价格在写入前被拒绝
    let rejected = api.edit_field(&child, "price", "-3").await;
    assert!(matches!(rejected, Err(ApiError::FieldValidationError { .. })));

    let edited = api
        .edit_field(&child, "price", "25.5")
        .await
        .expect("Edit should succeed");
    assert_eq!(edited.price, 25.5);

    let store = api.reconciler().store();
    let children = store
        .fetch_children(&shirt.id)
        .await
        .expect("Fetch children should succeed");
    assert_eq!(children.len(), 2);
    let stored = children
        .iter()
        .find(|r| r.id == child.node.id)
        .expect("Edited child should exist");
    assert_eq!(stored.price, 25.5);
    assert_eq!(stored.parent_id.as_deref(), Some(shirt.id.as_str()));

    let report = api
        .mass_delete(&[shirt.id.clone()])
        .await
        .expect("Mass delete should succeed");
    assert_eq!(report.affected_records, 3);

    let remaining = store.fetch_all().await.expect("Fetch should succeed");
    let skus: Vec<&str> = remaining.iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(skus, vec!["MUG-1"]);
}

#[tokio::test]
async fn test_mass_set_status_against_sqlite() {
    logging::init_test();

    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _sink) = create_api(&db_path);
    let outcome = api
        .import_csv_text(SHIRT_CSV)
        .expect("Import should succeed");
    api.bulk_replace(&outcome.forest)
        .await
        .expect("Bulk replace should succeed");

    let rows: Vec<SelectedRow> = outcome
        .forest
        .iter()
        .map(|n| SelectedRow {
            node: n.clone(),
            parent_id: None,
        })
        .collect();
    let report = api
        .mass_set_status(&rows, ProductStatus::Disabled)
        .await
        .expect("Mass status should succeed");
    assert!(report.failed.is_empty());

    let loaded = api.load().await.expect("Load should succeed");
    assert!(loaded
        .forest
        .iter()
        .all(|n| n.status == ProductStatus::Disabled));
    // 子商品状态不随父商品改变
    assert!(loaded.forest[0]
        .children
        .iter()
        .all(|c| c.status == ProductStatus::Enabled));
}

#[tokio::test]
async fn test_chunk_size_from_config_table() {
    logging::init_test();

    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    manager
        .set_global_config_value(config_keys::CHUNK_SIZE, "2")
        .expect("Failed to set config");

    let config = manager
        .load_sync_config(SyncConfig {
            db_path: db_path.clone(),
            ..SyncConfig::default()
        })
        .expect("Failed to load config");
    assert_eq!(config.chunk_size, 2);

    let store = Arc::new(SqliteProductStore::new(&db_path).expect("Failed to open store"));
    let api = CatalogApi::new(store, Arc::new(RecordingRowSink::new()), &config);
    let outcome = api
        .import_csv_text(SHIRT_CSV)
        .expect("Import should succeed");
    let bulk = api
        .bulk_replace(&outcome.forest)
        .await
        .expect("Bulk replace should succeed");

    assert_eq!(bulk.chunks, 2);
    assert_eq!(bulk.committed, 4);
}

async fn reimport_twice_keeps_hierarchy(conflict_key: &str) {
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let config = SyncConfig {
        db_path: db_path.clone(),
        conflict_key: conflict_key.to_string(),
        ..SyncConfig::default()
    };
    let store = Arc::new(SqliteProductStore::new(&db_path).expect("Failed to open store"));
    let sink = RecordingRowSink::new();
    let api = CatalogApi::new(store.clone(), Arc::new(sink.clone()), &config);
    let file = write_import_file(".csv", SHIRT_CSV).expect("Failed to write import file");

    let (first, first_bulk) = api
        .import_and_sync(file.path())
        .await
        .expect("First import should succeed");
    assert_eq!(first_bulk.remapped, 0);

    // 再次导入同一文件：每个节点都拿到新 id，需沿用已存储的 id
    let (second, second_bulk) = api
        .import_and_sync(file.path())
        .await
        .unwrap_or_else(|e| panic!("Second import with key {} failed: {}", conflict_key, e));
    assert_eq!(second_bulk.committed, 4);
    assert_eq!(second_bulk.remapped, 4);
    assert_eq!(second.forest, first.forest);
    assert_eq!(sink.latest(), Some(second.forest.clone()));

    let stored = store.fetch_all().await.expect("Fetch should succeed");
    assert_eq!(stored.len(), 4);

    let loaded = api.load().await.expect("Load should succeed");
    assert!(loaded.orphans.is_empty(), "Orphans after re-import: {:?}", loaded.orphans);
    let shape: Vec<(&str, usize)> = loaded
        .forest
        .iter()
        .map(|n| (n.sku.as_str(), n.children.len()))
        .collect();
    assert_eq!(shape, vec![("TS-1", 2), ("MUG-1", 0)]);
    assert_eq!(loaded.forest, second.forest);

    // 对齐后的 id 能直接用于编辑
    let row = SelectedRow {
        node: second.forest[0].children[0].clone(),
        parent_id: Some(second.forest[0].id.clone()),
    };
    api.edit_field(&row, "qty", "9")
        .await
        .expect("Edit after re-import should succeed");
}

#[tokio::test]
async fn test_reimport_same_file_with_id_conflict_key() {
    logging::init_test();
    reimport_twice_keeps_hierarchy("id").await;
}

#[tokio::test]
async fn test_reimport_same_file_with_sku_conflict_key() {
    logging::init_test();
    reimport_twice_keeps_hierarchy("sku").await;
}
