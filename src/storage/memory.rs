use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::CounterStorage;
use crate::counter::CounterState;
use crate::errors::Result;

/// 进程内存储，用于测试和 `database.backend = "memory"`
#[derive(Default)]
pub struct MemoryCounterStorage {
    data: DashMap<String, CounterState>,
}

impl MemoryCounterStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl CounterStorage for MemoryCounterStorage {
    async fn load(&self, key: &str) -> Result<Option<CounterState>> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn save(&self, key: &str, state: &CounterState) -> Result<()> {
        trace!("MemoryCounterStorage: save {} (count={})", key, state.count);
        self.data.insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
