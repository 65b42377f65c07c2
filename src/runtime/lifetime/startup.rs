use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::RouteSettings;
use crate::config::StaticConfig;
use crate::counter::CounterRegistry;
use crate::fallback::FallbackFactory;
use crate::metrics_core::MetricsRecorder;
use crate::services::ClickCounterService;
use crate::storage::StorageFactory;

pub struct StartupContext {
    pub click_service: Arc<ClickCounterService>,
    pub route_settings: RouteSettings,
    pub metrics: Arc<dyn MetricsRecorder>,
}

fn build_metrics() -> Arc<dyn MetricsRecorder> {
    #[cfg(feature = "metrics")]
    {
        crate::metrics::PrometheusMetrics::arc()
    }
    #[cfg(not(feature = "metrics"))]
    {
        crate::metrics_core::NoopMetrics::arc()
    }
}

/// 准备服务器启动的上下文：持久存储、降级存储、计数路由与点击服务
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // redis / sqlx 的 TLS 连接需要进程级 crypto provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let metrics = build_metrics();

    let storage = StorageFactory::create(&config.database, metrics.clone())
        .await
        .context("Failed to create counter storage")?;

    let fallback = FallbackFactory::create(&config.fallback)
        .await
        .context("Failed to create fallback store")?;

    let registry = Arc::new(CounterRegistry::new(
        storage,
        &config.counter,
        metrics.clone(),
    ));

    let click_service = Arc::new(ClickCounterService::from_config(
        registry,
        fallback,
        &config.counter,
        &config.fallback,
        metrics.clone(),
    ));

    let route_settings = RouteSettings::from_config(config);
    if route_settings.admin_token.is_empty() {
        warn!("Admin API is disabled (api.admin_token is empty)");
    } else {
        info!("Admin API available at: {}", route_settings.admin_prefix);
    }
    if route_settings.enable_dev_routes {
        warn!(
            "Dev routes enabled at {}: do not use in production",
            route_settings.dev_prefix
        );
    }

    info!("Pre-startup completed in {:?}", start_time.elapsed());
    Ok(StartupContext {
        click_service,
        route_settings,
        metrics,
    })
}
