//! Prometheus metrics endpoint (`/health/metrics`)

use actix_web::{HttpResponse, Responder, web};

use super::AppStartTime;
use crate::metrics::METRICS;

pub struct MetricsService;

impl MetricsService {
    pub async fn metrics(app_start_time: web::Data<AppStartTime>) -> impl Responder {
        let now = chrono::Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0) as f64;
        METRICS.uptime_seconds.set(uptime);

        HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4; charset=utf-8")
            .body(METRICS.export())
    }
}
