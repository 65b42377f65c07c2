//! Click counting service
//!
//! Primary/fallback strategy around the per-barcode counters: writes go to
//! the durable counter under a timeout and degrade to the fallback store on
//! any failure. Reads have no degraded mode.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{CounterConfig, FallbackConfig};
use crate::counter::{ClearResponse, ClickInput, CounterRegistry, CounterStats};
use crate::errors::{ClickLedgerError, Result};
use crate::fallback::FallbackStore;
use crate::metrics_core::MetricsRecorder;

/// Result of recording one click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOutcome {
    pub new_count: u64,
    /// Recorded through the fallback store (or dropped) instead of the durable counter
    pub fallback: bool,
}

pub struct ClickCounterService {
    registry: Arc<CounterRegistry>,
    fallback: Arc<dyn FallbackStore>,
    durable_timeout: Duration,
    fallback_timeout: Duration,
    metrics: Arc<dyn MetricsRecorder>,
}

impl ClickCounterService {
    pub fn new(
        registry: Arc<CounterRegistry>,
        fallback: Arc<dyn FallbackStore>,
        durable_timeout: Duration,
        fallback_timeout: Duration,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            registry,
            fallback,
            durable_timeout,
            fallback_timeout,
            metrics,
        }
    }

    pub fn from_config(
        registry: Arc<CounterRegistry>,
        fallback: Arc<dyn FallbackStore>,
        counter: &CounterConfig,
        fallback_config: &FallbackConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self::new(
            registry,
            fallback,
            Duration::from_millis(counter.durable_timeout_ms),
            Duration::from_millis(fallback_config.timeout_ms),
            metrics,
        )
    }

    pub fn registry(&self) -> &Arc<CounterRegistry> {
        &self.registry
    }

    pub fn fallback_store(&self) -> &Arc<dyn FallbackStore> {
        &self.fallback
    }

    async fn durable<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.durable_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClickLedgerError::durable_unavailable(format!(
                "counter did not answer within {:?}",
                self.durable_timeout
            ))),
        }
    }

    /// Record a click. Never fails: the degraded path is reported through
    /// `ClickOutcome::fallback`.
    pub async fn record_click(&self, barcode: &str, input: ClickInput) -> ClickOutcome {
        let durable_err = match self.durable(self.registry.record_click(barcode, input)).await {
            Ok(resp) => {
                self.metrics.inc_click_recorded("durable");
                return ClickOutcome {
                    new_count: resp.new_count,
                    fallback: false,
                };
            }
            Err(e) => e,
        };

        warn!(
            "Durable counter unavailable for {}, using fallback store: {}",
            barcode, durable_err
        );

        let fallback_result =
            match tokio::time::timeout(self.fallback_timeout, self.fallback.increment(barcode))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ClickLedgerError::fallback(format!(
                    "{} fallback did not answer within {:?}",
                    self.fallback.backend_name(),
                    self.fallback_timeout
                ))),
            };

        match fallback_result {
            Ok(new_count) => {
                self.metrics.inc_click_recorded("fallback");
                ClickOutcome {
                    new_count,
                    fallback: true,
                }
            }
            Err(e) => {
                self.metrics.inc_fallback_failure("increment");
                self.metrics.inc_click_recorded("dropped");
                error!(
                    "Click for {} dropped: durable error: {}; fallback error: {}",
                    barcode, durable_err, e
                );
                ClickOutcome {
                    new_count: 0,
                    fallback: true,
                }
            }
        }
    }

    pub async fn stats(&self, barcode: &str) -> Result<CounterStats> {
        self.durable(self.registry.get_stats(barcode)).await
    }

    pub async fn clear(&self, barcode: &str) -> Result<ClearResponse> {
        let resp = self.durable(self.registry.clear(barcode)).await?;
        info!("Counter {} cleared", barcode);
        Ok(resp)
    }

    pub async fn fallback_count(&self, barcode: &str) -> Result<u64> {
        self.fallback.get(barcode).await.inspect_err(|_| {
            self.metrics.inc_fallback_failure("get");
        })
    }

    pub async fn clear_fallback(&self) -> Result<u64> {
        let removed = self.fallback.clear().await.inspect_err(|_| {
            self.metrics.inc_fallback_failure("clear");
        })?;
        info!("Fallback store cleared ({} keys)", removed);
        Ok(removed)
    }
}
