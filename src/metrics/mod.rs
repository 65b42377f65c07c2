//! Prometheus metrics module
//!
//! # Feature
//! This module requires the `metrics` feature to be enabled.

mod registry;

use std::sync::Arc;

pub use registry::METRICS;

use crate::metrics_core::MetricsRecorder;

/// 将 `MetricsRecorder` 调用转发到全局 Prometheus registry
pub struct PrometheusMetrics;

impl PrometheusMetrics {
    pub fn arc() -> Arc<dyn MetricsRecorder> {
        Arc::new(Self)
    }
}

impl MetricsRecorder for PrometheusMetrics {
    fn inc_click_recorded(&self, path: &str) {
        METRICS.clicks_total.with_label_values(&[path]).inc();
    }

    fn inc_fallback_failure(&self, operation: &str) {
        METRICS
            .fallback_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    fn set_live_counters(&self, count: f64) {
        METRICS.live_counters.set(count);
    }

    fn observe_counter_operation(&self, operation: &str, duration_secs: f64) {
        METRICS
            .counter_operation_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    fn inc_auth_failure(&self, reason: &str) {
        METRICS.auth_failures_total.with_label_values(&[reason]).inc();
    }

    fn observe_db_query(&self, operation: &str, duration_secs: f64) {
        METRICS
            .db_query_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}
