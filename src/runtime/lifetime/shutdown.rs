use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::services::ClickCounterService;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 等待计数对象排空邮箱的时间（秒）
const COUNTER_DRAIN_SECS: u64 = 10;

/// 等待 Ctrl+C
pub async fn wait_for_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }
}

/// HTTP 服务停止后调用：关闭所有计数对象
pub async fn graceful_shutdown(service: &ClickCounterService) {
    match timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(service),
    )
    .await
    {
        Ok(()) => info!("All shutdown tasks completed successfully"),
        Err(_) => error!(
            "Shutdown tasks timed out after {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}

/// 每个计数对象处理完已入队的指令后退出
async fn perform_shutdown_tasks(service: &ClickCounterService) {
    let registry = service.registry();
    let live = registry.live_count();
    registry
        .shutdown(Duration::from_secs(COUNTER_DRAIN_SECS))
        .await;
    info!("Counter registry drained ({} counters)", live);

    if let Err(e) = registry.storage().close().await {
        warn!("Failed to close counter storage: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CounterConfig, FallbackConfig};
    use crate::counter::{ClickInput, CounterRegistry};
    use crate::fallback::MemoryFallbackStore;
    use crate::metrics_core::NoopMetrics;
    use crate::storage::MemoryCounterStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_graceful_shutdown_drains_registry() {
        let registry = Arc::new(CounterRegistry::new(
            Arc::new(MemoryCounterStorage::new()),
            &CounterConfig::default(),
            NoopMetrics::arc(),
        ));
        let service = ClickCounterService::from_config(
            registry.clone(),
            Arc::new(MemoryFallbackStore::new()),
            &CounterConfig::default(),
            &FallbackConfig::default(),
            NoopMetrics::arc(),
        );
        service.record_click("A", ClickInput::new("o")).await;
        assert_eq!(registry.live_count(), 1);

        graceful_shutdown(&service).await;
        assert_eq!(registry.live_count(), 0);
    }
}
