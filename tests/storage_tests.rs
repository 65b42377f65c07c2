//! Storage backend tests
//!
//! SeaOrmCounterStorage over temporary SQLite databases.

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use clickledger::config::{CounterConfig, DatabaseBackend, DatabaseConfig};
use clickledger::counter::{ClickInput, ClickRecord, CounterLimits, CounterRegistry, CounterState};
use clickledger::metrics_core::NoopMetrics;
use clickledger::errors::ClickLedgerError;
use clickledger::storage::backend::connect_sqlite;
use clickledger::storage::{CounterStorage, SeaOrmCounterStorage, StorageFactory};
use sea_orm::ConnectionTrait;

fn sqlite_url(dir: &TempDir) -> String {
    format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("clickledger_test.db").display()
    )
}

async fn sqlite_storage(dir: &TempDir) -> SeaOrmCounterStorage {
    let config = DatabaseConfig {
        backend: DatabaseBackend::Sqlite,
        database_url: sqlite_url(dir),
        ..Default::default()
    };
    SeaOrmCounterStorage::connect(&config, DatabaseBackend::Sqlite, NoopMetrics::arc())
        .await
        .expect("Failed to create sqlite storage")
}

fn state_with(n: usize) -> CounterState {
    let mut state = CounterState::default();
    for i in 0..n {
        let record = ClickRecord::from_input(
            ClickInput::new(format!("offer-{}", i)),
            &CounterLimits::default(),
            Utc::now(),
        );
        state.push_click(record, 200);
    }
    state
}

#[tokio::test]
async fn test_load_missing_key_is_none() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;
    assert!(storage.load("NOPE").await.unwrap().is_none());
    assert_eq!(storage.backend_name(), "sqlite");
    storage.ping().await.unwrap();
}

#[tokio::test]
async fn test_save_then_load_and_overwrite() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;

    let first = state_with(3);
    storage.save("TESTAFF123", &first).await.unwrap();
    assert_eq!(storage.load("TESTAFF123").await.unwrap(), Some(first));

    // upsert 覆盖整行
    let second = state_with(5);
    storage.save("TESTAFF123", &second).await.unwrap();
    let loaded = storage.load("TESTAFF123").await.unwrap().unwrap();
    assert_eq!(loaded.count, 5);
    assert_eq!(loaded.clicks.len(), 5);
    assert_eq!(loaded.clicks[0].offer_item_id, "offer-4");
}

#[tokio::test]
async fn test_delete_removes_row() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;

    storage.save("GONE", &state_with(1)).await.unwrap();
    storage.delete("GONE").await.unwrap();
    assert!(storage.load("GONE").await.unwrap().is_none());

    // 删除不存在的 key 不报错
    storage.delete("NEVER").await.unwrap();
}

#[tokio::test]
async fn test_state_persists_across_reconnect() {
    let dir = TempDir::new().unwrap();
    {
        let storage = sqlite_storage(&dir).await;
        storage.save("DURABLE", &state_with(2)).await.unwrap();
    }

    let storage = sqlite_storage(&dir).await;
    let loaded = storage.load("DURABLE").await.unwrap().unwrap();
    assert_eq!(loaded.count, 2);
}

#[tokio::test]
async fn test_registry_over_sqlite() {
    let dir = TempDir::new().unwrap();
    let storage: Arc<dyn CounterStorage> = Arc::new(sqlite_storage(&dir).await);
    let reg = CounterRegistry::new(storage.clone(), &CounterConfig::default(), NoopMetrics::arc());

    for i in 0..12 {
        reg.record_click("SQL", ClickInput::new(format!("offer-{}", i)))
            .await
            .unwrap();
    }
    let stats = reg.get_stats("SQL").await.unwrap();
    assert_eq!(stats.count, 12);
    assert_eq!(stats.last_clicks.len(), 10);
    assert_eq!(stats.last_clicks[0].offer_item_id, "offer-11");

    reg.clear("SQL").await.unwrap();
    assert!(storage.load("SQL").await.unwrap().is_none());
}

#[tokio::test]
async fn test_factory_memory_backend() {
    let config = DatabaseConfig {
        backend: DatabaseBackend::Memory,
        ..Default::default()
    };
    let storage = StorageFactory::create(&config, NoopMetrics::arc())
        .await
        .unwrap();
    assert_eq!(storage.backend_name(), "memory");
}

/// 200 条记录，每个可截断字段都取满长度的 4 字节字符
fn widest_window() -> CounterState {
    let limits = CounterLimits::default();
    let mut state = CounterState::default();
    for _ in 0..200 {
        let input = ClickInput {
            offer_item_id: "🛒".repeat(limits.offer_item_max_chars + 10),
            affiliate_url: Some("🔗".repeat(limits.url_max_chars + 10)),
            timestamp: None,
            client_ip: Some("🌐".repeat(limits.client_ip_max_chars + 10)),
            user_agent: Some("🤖".repeat(limits.user_agent_max_chars + 10)),
        };
        let record = ClickRecord::from_input(input, &limits, Utc::now());
        state.push_click(record, 200);
    }
    state
}

#[tokio::test]
async fn test_full_window_fits_clicks_column() {
    let state = widest_window();
    let encoded = serde_json::to_string(&state.clicks).unwrap();
    // MySQL TEXT（64 KiB）放不下满窗口
    assert!(encoded.len() > 65_535);
    assert!(encoded.len() <= migration::MYSQL_CLICKS_MAX_BYTES);

    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;
    storage.save("WIDE", &state).await.unwrap();
    let loaded = storage.load("WIDE").await.unwrap().unwrap();
    assert_eq!(loaded.clicks.len(), 200);
    assert_eq!(loaded, state);
}

#[tokio::test]
async fn test_negative_count_is_a_storage_error() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;
    storage.save("CORRUPT", &state_with(3)).await.unwrap();

    let db = connect_sqlite(&sqlite_url(&dir)).await.unwrap();
    db.execute_unprepared("UPDATE counter_states SET count = -5 WHERE barcode = 'CORRUPT'")
        .await
        .unwrap();

    let err = storage.load("CORRUPT").await.unwrap_err();
    assert!(matches!(err, ClickLedgerError::Storage(_)));
}
