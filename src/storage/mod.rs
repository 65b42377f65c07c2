//! 计数对象的持久存储
//!
//! `CounterStorage` 只暴露整行读写：计数对象自己负责串行化，
//! 存储层不需要提供比"单行原子写"更强的保证。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::counter::CounterState;
use crate::errors::Result;
use crate::metrics_core::MetricsRecorder;

pub mod backend;
pub mod memory;

pub use backend::SeaOrmCounterStorage;
pub use memory::MemoryCounterStorage;

#[async_trait]
pub trait CounterStorage: Send + Sync {
    /// 读取 key 的状态；从未写入过时返回 `None`
    async fn load(&self, key: &str) -> Result<Option<CounterState>>;

    /// 整体写回 count 与 clicks
    async fn save(&self, key: &str, state: &CounterState) -> Result<()>;

    /// 删除 key 的全部状态
    async fn delete(&self, key: &str) -> Result<()>;

    /// 健康检查
    async fn ping(&self) -> Result<()>;

    /// 关闭底层连接池，关机时在计数对象排空后调用
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(
        config: &DatabaseConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Result<Arc<dyn CounterStorage>> {
        let storage: Arc<dyn CounterStorage> = match config.backend {
            DatabaseBackend::Memory => Arc::new(MemoryCounterStorage::new()),
            backend => Arc::new(SeaOrmCounterStorage::connect(config, backend, metrics).await?),
        };
        info!("Using counter storage backend: {}", storage.backend_name());
        Ok(storage)
    }
}
