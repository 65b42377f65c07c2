//! 集成测试共享的装配与故障注入存储

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use clickledger::api::RouteSettings;
use clickledger::config::{CounterConfig, FallbackConfig};
use clickledger::counter::{CounterRegistry, CounterState};
use clickledger::errors::{ClickLedgerError, Result};
use clickledger::fallback::{FallbackStore, MemoryFallbackStore};
use clickledger::metrics_core::NoopMetrics;
use clickledger::services::ClickCounterService;
use clickledger::storage::{CounterStorage, MemoryCounterStorage};

pub const ADMIN_TOKEN: &str = "test-admin-secret";

pub fn route_settings() -> RouteSettings {
    RouteSettings {
        admin_token: ADMIN_TOKEN.to_string(),
        admin_prefix: "/admin".to_string(),
        health_prefix: "/health".to_string(),
        dev_prefix: "/dev".to_string(),
        enable_dev_routes: true,
    }
}

pub fn build_service(
    storage: Arc<dyn CounterStorage>,
    fallback: Arc<dyn FallbackStore>,
    durable_timeout: Duration,
) -> Arc<ClickCounterService> {
    let registry = Arc::new(CounterRegistry::new(
        storage,
        &CounterConfig::default(),
        NoopMetrics::arc(),
    ));
    Arc::new(ClickCounterService::new(
        registry,
        fallback,
        durable_timeout,
        Duration::from_millis(FallbackConfig::default().timeout_ms),
        NoopMetrics::arc(),
    ))
}

pub fn memory_service() -> Arc<ClickCounterService> {
    build_service(
        Arc::new(MemoryCounterStorage::new()),
        Arc::new(MemoryFallbackStore::new()),
        Duration::from_secs(2),
    )
}

/// 统计每类调用次数的内存存储
#[derive(Default)]
pub struct CountingStorage {
    inner: MemoryCounterStorage,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
}

impl CountingStorage {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterStorage for CountingStorage {
    async fn load(&self, key: &str) -> Result<Option<CounterState>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, state: &CounterState) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(key, state).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

/// 所有操作都失败
pub struct FailingStorage;

#[async_trait]
impl CounterStorage for FailingStorage {
    async fn load(&self, _key: &str) -> Result<Option<CounterState>> {
        Err(ClickLedgerError::storage("simulated outage"))
    }

    async fn save(&self, _key: &str, _state: &CounterState) -> Result<()> {
        Err(ClickLedgerError::storage("simulated outage"))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(ClickLedgerError::storage("simulated outage"))
    }

    async fn ping(&self) -> Result<()> {
        Err(ClickLedgerError::database_connection("simulated outage"))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// 每次读写前睡眠 `delay`
pub struct SlowStorage {
    inner: MemoryCounterStorage,
    delay: Duration,
}

impl SlowStorage {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryCounterStorage::new(),
            delay,
        }
    }
}

#[async_trait]
impl CounterStorage for SlowStorage {
    async fn load(&self, key: &str) -> Result<Option<CounterState>> {
        tokio::time::sleep(self.delay).await;
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, state: &CounterState) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(key, state).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}
