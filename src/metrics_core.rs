//! Core metrics traits (always compiled, no feature gate).
//!
//! Everything that records metrics takes an `Arc<dyn MetricsRecorder>`.
//! Without the `metrics` feature, `NoopMetrics` is injected.

use std::sync::Arc;

/// Trait for recording application metrics.
///
/// All methods are no-op by default, allowing partial implementation.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync {
    // ===== Clicks =====

    /// Record an accepted click by path (`durable`, `fallback`, `dropped`)
    fn inc_click_recorded(&self, path: &str) {}

    /// Record a fallback store failure
    fn inc_fallback_failure(&self, operation: &str) {}

    // ===== Counter actors =====

    /// Set number of live counter actors
    fn set_live_counters(&self, count: f64) {}

    /// Observe a counter command round trip (`click`, `stats`, `clear`)
    fn observe_counter_operation(&self, operation: &str, duration_secs: f64) {}

    // ===== Auth =====

    /// Record authentication failure
    fn inc_auth_failure(&self, reason: &str) {}

    // ===== Database =====

    /// Observe database query duration
    fn observe_db_query(&self, operation: &str, duration_secs: f64) {}
}

/// Noop metrics implementation for testing and non-metrics builds.
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {}

impl NoopMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn arc() -> Arc<dyn MetricsRecorder> {
        Arc::new(Self::new())
    }
}

impl Default for NoopMetrics {
    fn default() -> Self {
        Self::new()
    }
}
