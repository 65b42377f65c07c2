use actix_web::{HttpResponse, Responder, web};
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::api::types::{ComponentCheck, HealthChecks, HealthResponse};
use crate::services::ClickCounterService;

#[cfg(feature = "metrics")]
use super::metrics::MetricsService;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

// 应用启动时间
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

fn check_result(backend: &str, result: Option<crate::errors::Result<()>>) -> ComponentCheck {
    let (status, error) = match result {
        Some(Ok(())) => ("healthy", None),
        Some(Err(e)) => {
            error!("{} health check failed: {}", backend, e);
            ("unhealthy", Some(e.to_string()))
        }
        None => {
            error!("{} health check timeout", backend);
            ("unhealthy", Some("timeout".to_string()))
        }
    };
    ComponentCheck {
        status: status.to_string(),
        backend: backend.to_string(),
        error,
    }
}

pub struct HealthService;

impl HealthService {
    /// 持久存储健康即视为可用；降级存储异常只体现在 body 中
    pub async fn health_check(
        service: web::Data<ClickCounterService>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let storage = service.registry().storage();
        let durable = check_result(
            storage.backend_name(),
            tokio::time::timeout(CHECK_TIMEOUT, storage.ping()).await.ok(),
        );

        let fallback = service.fallback_store();
        let fallback_check = check_result(
            fallback.backend_name(),
            tokio::time::timeout(CHECK_TIMEOUT, fallback.get("__health__"))
                .await
                .ok()
                .map(|r| r.map(|_| ())),
        );

        let now = chrono::Utc::now();
        let is_healthy = durable.is_healthy();
        let body = HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            timestamp: now.to_rfc3339(),
            uptime: (now - app_start_time.start_datetime).num_seconds().max(0) as u64,
            live_counters: service.registry().live_count(),
            checks: HealthChecks {
                durable,
                fallback: fallback_check,
            },
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Health check completed in {:?}, status: {}",
            start_time.elapsed(),
            body.status
        );

        if is_healthy {
            HttpResponse::Ok().json(body)
        } else {
            HttpResponse::ServiceUnavailable().json(body)
        }
    }

    // 活跃性检查，进程能响应即可
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");
        HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body("OK")
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    let scope = web::scope("")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::health_check))
        .route("/ready", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check));

    #[cfg(feature = "metrics")]
    let scope = scope.route("/metrics", web::get().to(MetricsService::metrics));

    scope
}
