use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::FallbackStore;
use crate::errors::{ClickLedgerError, Result};

/// Redis 降级计数：`INCR` / `GET`，清空时按前缀 `SCAN` + `DEL`
pub struct RedisFallbackStore {
    client: redis::Client,
    /// 持久化连接，出错时重置
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisFallbackStore {
    /// 建立连接并 PING 一次
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| ClickLedgerError::config(format!("Invalid redis url: {}", e)))?;
        let store = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: key_prefix.to_string(),
        };

        let mut conn = store.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis fallback store connected: {}", pong);
        Ok(store)
    }

    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        {
            let guard = self.connection.read().await;
            if let Some(ref conn) = *guard {
                return Ok(conn.clone());
            }
        }

        let mut guard = self.connection.write().await;
        if let Some(ref conn) = *guard {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset_connection(&self) {
        *self.connection.write().await = None;
        debug!("Redis fallback connection reset");
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// 连接类错误时丢弃缓存连接，下一次重新建立
    async fn on_error(&self, op: &str, err: redis::RedisError) -> ClickLedgerError {
        warn!("Redis fallback {} failed: {}", op, err);
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            self.reset_connection().await;
        }
        err.into()
    }
}

#[async_trait]
impl FallbackStore for RedisFallbackStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        match conn.incr::<_, _, u64>(self.make_key(key), 1u64).await {
            Ok(v) => Ok(v),
            Err(e) => Err(self.on_error("INCR", e).await),
        }
    }

    async fn get(&self, key: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        match conn.get::<_, Option<u64>>(self.make_key(key)).await {
            Ok(v) => Ok(v.unwrap_or(0)),
            Err(e) => Err(self.on_error("GET", e).await),
        }
    }

    async fn clear(&self) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        let pattern = format!("{}*", self.key_prefix);
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
            {
                Ok(page) => page,
                Err(e) => return Err(self.on_error("SCAN", e).await),
            };

            if !keys.is_empty() {
                match conn.del::<_, u64>(&keys).await {
                    Ok(n) => removed += n,
                    Err(e) => return Err(self.on_error("DEL", e).await),
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("Redis fallback cleared {} keys", removed);
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
