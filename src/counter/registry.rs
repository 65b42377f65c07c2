use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::http::Method;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::actor::CounterHandle;
use super::object::CounterObject;
use super::protocol::{ClearResponse, CounterCommand, CounterReply, RecordClickResponse};
use super::{ClickInput, CounterLimits, CounterStats};
use crate::config::CounterConfig;
use crate::errors::{ClickLedgerError, Result};
use crate::metrics_core::MetricsRecorder;
use crate::storage::CounterStorage;

struct CounterEntry {
    handle: CounterHandle,
    task: JoinHandle<()>,
}

/// barcode → 计数对象的路由表
///
/// 同一 key 永远只有一个存活的对象；对象在首次访问时创建，
/// 空闲超时后退出并从路由表移除，下一次访问时从存储重新加载。
pub struct CounterRegistry {
    counters: Arc<DashMap<Arc<str>, CounterEntry>>,
    storage: Arc<dyn CounterStorage>,
    limits: CounterLimits,
    mailbox_capacity: usize,
    idle_timeout: Option<Duration>,
    runtime: Handle,
    metrics: Arc<dyn MetricsRecorder>,
}

impl CounterRegistry {
    /// 对象任务运行在当前 tokio runtime 上（必须在 runtime 内调用）
    pub fn new(
        storage: Arc<dyn CounterStorage>,
        config: &CounterConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self::with_runtime(storage, config, metrics, Handle::current())
    }

    pub fn with_runtime(
        storage: Arc<dyn CounterStorage>,
        config: &CounterConfig,
        metrics: Arc<dyn MetricsRecorder>,
        runtime: Handle,
    ) -> Self {
        let idle_timeout =
            (config.idle_timeout_secs > 0).then(|| Duration::from_secs(config.idle_timeout_secs));
        Self {
            counters: Arc::new(DashMap::new()),
            storage,
            limits: CounterLimits::from(config),
            mailbox_capacity: config.mailbox_capacity,
            idle_timeout,
            runtime,
            metrics,
        }
    }

    /// 覆盖空闲回收时间，`None` 表示对象常驻
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn storage(&self) -> &Arc<dyn CounterStorage> {
        &self.storage
    }

    fn spawn(&self, key: &str) -> CounterEntry {
        let key: Arc<str> = Arc::from(key);
        let object = CounterObject::new(key.clone(), self.storage.clone(), self.limits);

        // 只移除已关闭的条目，避免误删同 key 新建的对象
        let counters = Arc::downgrade(&self.counters);
        let metrics = self.metrics.clone();
        let on_exit = move || {
            if let Some(counters) = counters.upgrade()
                && counters
                    .remove_if(&key, |_, entry| entry.handle.is_closed())
                    .is_some()
            {
                debug!("Counter {} evicted", key);
                metrics.set_live_counters(counters.len() as f64);
            }
        };

        let (handle, task) = CounterHandle::spawn(
            object,
            self.mailbox_capacity,
            self.idle_timeout,
            &self.runtime,
            on_exit,
        );
        CounterEntry { handle, task }
    }

    /// 获取 key 对应的对象句柄，必要时创建或替换
    pub fn handle(&self, key: &str) -> CounterHandle {
        if let Some(entry) = self.counters.get(key)
            && !entry.handle.is_closed()
        {
            return entry.handle.clone();
        }

        let (handle, created) = match self.counters.entry(Arc::from(key)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().handle.is_closed() {
                    warn!("Counter {} stopped unexpectedly, respawning", key);
                    occupied.insert(self.spawn(key));
                }
                (occupied.get().handle.clone(), false)
            }
            Entry::Vacant(vacant) => {
                debug!("Spawning counter for {}", key);
                let entry = vacant.insert(self.spawn(key));
                (entry.handle.clone(), true)
            }
        };

        if created {
            self.metrics.set_live_counters(self.counters.len() as f64);
        }
        handle
    }

    /// 将指令转发到 key 对应的对象
    pub async fn route(&self, key: &str, command: CounterCommand) -> Result<CounterReply> {
        let op = command.operation();
        let start = Instant::now();
        let result = match self.handle(key).enqueue(command).await {
            Ok(pending) => pending.wait().await,
            // 对象恰好空闲退出，换新对象重投一次
            Err(command) => match self.handle(key).enqueue(command).await {
                Ok(pending) => pending.wait().await,
                Err(_) => Err(ClickLedgerError::durable_unavailable(format!(
                    "Counter {} mailbox closed",
                    key
                ))),
            },
        };
        self.metrics
            .observe_counter_operation(op, start.elapsed().as_secs_f64());
        result
    }

    /// HTTP 形态入口：按 method + path 解析后转发
    pub async fn fetch(
        &self,
        key: &str,
        method: &Method,
        path: &str,
        body: &[u8],
    ) -> Result<CounterReply> {
        let command = CounterCommand::from_request(method, path, body)?;
        self.route(key, command).await
    }

    pub async fn record_click(&self, key: &str, input: ClickInput) -> Result<RecordClickResponse> {
        match self.route(key, CounterCommand::RecordClick(input)).await? {
            CounterReply::Clicked(resp) => Ok(resp),
            other => Err(other.unexpected("click")),
        }
    }

    pub async fn get_stats(&self, key: &str) -> Result<CounterStats> {
        match self.route(key, CounterCommand::GetStats).await? {
            CounterReply::Stats(stats) => Ok(stats),
            other => Err(other.unexpected("stats")),
        }
    }

    pub async fn clear(&self, key: &str) -> Result<ClearResponse> {
        match self.route(key, CounterCommand::Clear).await? {
            CounterReply::Cleared(resp) => Ok(resp),
            other => Err(other.unexpected("clear")),
        }
    }

    pub fn live_count(&self) -> usize {
        self.counters.len()
    }

    /// 关闭所有邮箱并等待处理中的指令完成，超时后强制终止
    pub async fn shutdown(&self, timeout: Duration) {
        let keys: Vec<Arc<str>> = self.counters.iter().map(|e| e.key().clone()).collect();
        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, entry)) = self.counters.remove(&key) {
                drop(entry.handle);
                tasks.push(entry.task);
            }
        }
        self.metrics.set_live_counters(0.0);

        if tasks.is_empty() {
            return;
        }
        let count = tasks.len();
        let aborts: Vec<_> = tasks.iter().map(|t| t.abort_handle()).collect();

        match tokio::time::timeout(timeout, futures_util::future::join_all(tasks)).await {
            Ok(_) => info!("{} counters stopped", count),
            Err(_) => {
                warn!(
                    "Counters did not drain within {:?}, aborting remaining tasks",
                    timeout
                );
                for abort in aborts {
                    abort.abort();
                }
            }
        }
    }
}
