//! 降级计数存储
//!
//! 持久计数对象不可用时，点击只在这里累加一个整数。
//! 不保证同一 key 的并发写入有序，也不保存点击明细。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{FallbackBackend, FallbackConfig};
use crate::errors::Result;

pub mod memory;
pub mod redis;

pub use memory::MemoryFallbackStore;
pub use redis::RedisFallbackStore;

#[async_trait]
pub trait FallbackStore: Send + Sync {
    /// 计数加一，返回新值
    async fn increment(&self, key: &str) -> Result<u64>;

    /// 读取当前计数，不存在时为 0
    async fn get(&self, key: &str) -> Result<u64>;

    /// 清空全部降级计数，返回删除的 key 数
    async fn clear(&self) -> Result<u64>;

    fn backend_name(&self) -> &'static str;
}

pub struct FallbackFactory;

impl FallbackFactory {
    pub async fn create(config: &FallbackConfig) -> Result<Arc<dyn FallbackStore>> {
        let store: Arc<dyn FallbackStore> = match config.backend {
            FallbackBackend::Memory => Arc::new(MemoryFallbackStore::new()),
            FallbackBackend::Redis => Arc::new(
                RedisFallbackStore::connect(&config.redis_url, &config.key_prefix).await?,
            ),
        };
        info!("Using fallback store: {}", store.backend_name());
        Ok(store)
    }
}
