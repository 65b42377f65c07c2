use async_trait::async_trait;
use dashmap::DashMap;

use super::FallbackStore;
use crate::errors::Result;

/// 进程内降级计数
#[derive(Default)]
pub struct MemoryFallbackStore {
    counts: DashMap<String, u64>,
}

impl MemoryFallbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FallbackStore for MemoryFallbackStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        let mut entry = self.counts.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(1);
        Ok(*entry)
    }

    async fn get(&self, key: &str) -> Result<u64> {
        Ok(self.counts.get(key).map(|v| *v).unwrap_or(0))
    }

    async fn clear(&self) -> Result<u64> {
        let removed = self.counts.len() as u64;
        self.counts.clear();
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
