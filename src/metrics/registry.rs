//! Global metrics registry
//!
//! Defines all Prometheus metrics used in the application.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

/// Global metrics instance
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Application metrics container
pub struct Metrics {
    registry: Registry,

    // ===== Click metrics =====
    /// Accepted clicks by path (durable / fallback / dropped)
    pub clicks_total: CounterVec,
    /// Fallback store failures by operation
    pub fallback_failures_total: CounterVec,

    // ===== Counter actor metrics =====
    /// Number of live counter actors
    pub live_counters: Gauge,
    /// Counter command round trip latency
    pub counter_operation_seconds: HistogramVec,

    // ===== Auth / DB =====
    pub auth_failures_total: CounterVec,
    pub db_query_seconds: HistogramVec,

    // ===== System metrics =====
    /// Server uptime in seconds
    pub uptime_seconds: Gauge,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let clicks_total = CounterVec::new(
            Opts::new("clickledger_clicks_recorded_total", "Total accepted clicks by path"),
            &["path"],
        )
        .expect("Failed to create clicks_total metric");

        let fallback_failures_total = CounterVec::new(
            Opts::new(
                "clickledger_fallback_failures_total",
                "Total fallback store failures by operation",
            ),
            &["operation"],
        )
        .expect("Failed to create fallback_failures_total metric");

        let live_counters = Gauge::new(
            "clickledger_live_counters",
            "Number of live per-barcode counter actors",
        )
        .expect("Failed to create live_counters metric");

        let counter_operation_seconds = HistogramVec::new(
            HistogramOpts::new(
                "clickledger_counter_operation_duration_seconds",
                "Counter command round trip latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
            &["operation"],
        )
        .expect("Failed to create counter_operation_seconds metric");

        let auth_failures_total = CounterVec::new(
            Opts::new(
                "clickledger_auth_failures_total",
                "Total admin authentication failures",
            ),
            &["reason"],
        )
        .expect("Failed to create auth_failures_total metric");

        let db_query_seconds = HistogramVec::new(
            HistogramOpts::new("clickledger_db_query_seconds", "Database query duration"),
            &["operation"],
        )
        .expect("Failed to create db_query_seconds metric");

        let uptime_seconds = Gauge::new("clickledger_uptime_seconds", "Server uptime in seconds")
            .expect("Failed to create uptime_seconds metric");

        registry
            .register(Box::new(clicks_total.clone()))
            .expect("Failed to register clicks_total");
        registry
            .register(Box::new(fallback_failures_total.clone()))
            .expect("Failed to register fallback_failures_total");
        registry
            .register(Box::new(live_counters.clone()))
            .expect("Failed to register live_counters");
        registry
            .register(Box::new(counter_operation_seconds.clone()))
            .expect("Failed to register counter_operation_seconds");
        registry
            .register(Box::new(auth_failures_total.clone()))
            .expect("Failed to register auth_failures_total");
        registry
            .register(Box::new(db_query_seconds.clone()))
            .expect("Failed to register db_query_seconds");
        registry
            .register(Box::new(uptime_seconds.clone()))
            .expect("Failed to register uptime_seconds");

        Self {
            registry,
            clicks_total,
            fallback_failures_total,
            live_counters,
            counter_operation_seconds,
            auth_failures_total,
            db_query_seconds,
            uptime_seconds,
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_click_metrics() {
        METRICS.clicks_total.with_label_values(&["durable"]).inc();
        let text = METRICS.export();
        assert!(text.contains("clickledger_clicks_recorded_total"));
    }
}
