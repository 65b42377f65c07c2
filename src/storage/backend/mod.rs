//! SeaORM storage backend
//!
//! 每个 barcode 在 `counter_states` 表中占一行：count 与最近点击窗口（JSON）
//! 一起写入，单行 upsert 即可保证二者一致。

mod connection;
pub mod retry;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};
use tracing::{debug, info};

use super::CounterStorage;
use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::counter::{ClickRecord, CounterState};
use crate::errors::{ClickLedgerError, Result};
use crate::metrics_core::MetricsRecorder;
use migration::entities::counter_state;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
use retry::{RetryConfig, with_retry};

/// SeaORM-based counter storage (SQLite / MySQL / PostgreSQL)
#[derive(Clone)]
pub struct SeaOrmCounterStorage {
    db: DatabaseConnection,
    backend: DatabaseBackend,
    retry: RetryConfig,
    metrics: Arc<dyn MetricsRecorder>,
}

impl SeaOrmCounterStorage {
    /// 连接数据库并执行迁移
    pub async fn connect(
        config: &DatabaseConfig,
        backend: DatabaseBackend,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(ClickLedgerError::config("database.database_url is empty"));
        }

        let db = match backend {
            DatabaseBackend::Sqlite => connect_sqlite(&config.database_url).await?,
            DatabaseBackend::Mysql | DatabaseBackend::Postgres => {
                connect_generic(&config.database_url, &backend.to_string(), config.pool_size).await?
            }
            DatabaseBackend::Memory => {
                return Err(ClickLedgerError::config(
                    "memory backend does not use a database connection",
                ));
            }
        };

        run_migrations(&db).await?;

        let storage = Self::from_connection(db, backend, metrics)
            .with_retry_config(RetryConfig::with_max_retries(config.retry_count));
        info!("{} counter storage initialized", backend.to_string().to_uppercase());
        Ok(storage)
    }

    /// 使用已有连接构造（调用方负责迁移）
    pub fn from_connection(
        db: DatabaseConnection,
        backend: DatabaseBackend,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            db,
            backend,
            retry: RetryConfig::default(),
            metrics,
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn to_state(model: counter_state::Model) -> Result<CounterState> {
        let count = u64::try_from(model.count).map_err(|_| {
            ClickLedgerError::storage(format!(
                "negative count for '{}': {}",
                model.barcode, model.count
            ))
        })?;
        let clicks: Vec<ClickRecord> = serde_json::from_str(&model.clicks)?;
        Ok(CounterState {
            count,
            clicks: clicks.into(),
        })
    }

    fn to_active_model(key: &str, state: &CounterState) -> Result<counter_state::ActiveModel> {
        let count = i64::try_from(state.count).map_err(|_| {
            ClickLedgerError::storage(format!("count overflow for '{}': {}", key, state.count))
        })?;
        Ok(counter_state::ActiveModel {
            barcode: Set(key.to_string()),
            count: Set(count),
            clicks: Set(serde_json::to_string(&state.clicks)?),
            updated_at: Set(Utc::now()),
        })
    }
}

#[async_trait]
impl CounterStorage for SeaOrmCounterStorage {
    async fn load(&self, key: &str) -> Result<Option<CounterState>> {
        let start = Instant::now();
        let model = with_retry("counter_states.load", self.retry, || {
            counter_state::Entity::find_by_id(key.to_string()).one(&self.db)
        })
        .await
        .map_err(|e| ClickLedgerError::storage(format!("load '{}' failed: {}", key, e)))?;
        self.metrics
            .observe_db_query("load", start.elapsed().as_secs_f64());

        model.map(Self::to_state).transpose()
    }

    async fn save(&self, key: &str, state: &CounterState) -> Result<()> {
        let start = Instant::now();
        let active = Self::to_active_model(key, state)?;
        with_retry("counter_states.save", self.retry, || {
            counter_state::Entity::insert(active.clone())
                .on_conflict(
                    OnConflict::column(counter_state::Column::Barcode)
                        .update_columns([
                            counter_state::Column::Count,
                            counter_state::Column::Clicks,
                            counter_state::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&self.db)
        })
        .await
        .map_err(|e| ClickLedgerError::storage(format!("save '{}' failed: {}", key, e)))?;
        self.metrics
            .observe_db_query("save", start.elapsed().as_secs_f64());

        debug!("Counter state saved: {} (count={})", key, state.count);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        with_retry("counter_states.delete", self.retry, || {
            counter_state::Entity::delete_by_id(key.to_string()).exec(&self.db)
        })
        .await
        .map_err(|e| ClickLedgerError::storage(format!("delete '{}' failed: {}", key, e)))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| ClickLedgerError::database_connection(e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        // 连接句柄共享同一个池，关闭克隆即关闭池
        self.db
            .clone()
            .close()
            .await
            .map_err(|e| ClickLedgerError::database_connection(e.to_string()))?;
        info!("{} connection pool closed", self.backend_name());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        match self.backend {
            DatabaseBackend::Sqlite => "sqlite",
            DatabaseBackend::Mysql => "mysql",
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::Memory => "memory",
        }
    }
}
