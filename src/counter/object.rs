use std::sync::Arc;

use chrono::Utc;
use tracing::{trace, warn};

use super::protocol::{ClearResponse, CounterCommand, CounterReply, RecordClickResponse};
use super::{ClickInput, ClickRecord, CounterLimits, CounterState, CounterStats};
use crate::errors::Result;
use crate::storage::CounterStorage;

/// 单个 barcode 的计数状态机
///
/// 只能被所属 actor 以 `&mut self` 访问，因此同一 key 的操作天然串行。
/// 首次成功读取后保留一份写穿缓存，任何存储错误都会丢弃缓存，
/// 下一次操作重新从存储读取。
pub struct CounterObject {
    key: Arc<str>,
    storage: Arc<dyn CounterStorage>,
    limits: CounterLimits,
    cached: Option<CounterState>,
}

impl CounterObject {
    pub fn new(key: Arc<str>, storage: Arc<dyn CounterStorage>, limits: CounterLimits) -> Self {
        Self {
            key,
            storage,
            limits,
            cached: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn load(&mut self) -> Result<&CounterState> {
        if self.cached.is_none() {
            let state = self.storage.load(&self.key).await?.unwrap_or_default();
            trace!("Counter {} loaded (count={})", self.key, state.count);
            self.cached = Some(state);
        }
        Ok(self.cached.get_or_insert_with(CounterState::default))
    }

    fn invalidate(&mut self, op: &str, err: &crate::errors::ClickLedgerError) {
        warn!("Counter {} {} failed, dropping cached state: {}", self.key, op, err);
        self.cached = None;
    }

    pub async fn record_click(&mut self, input: ClickInput) -> Result<RecordClickResponse> {
        let mut next = match self.load().await {
            Ok(state) => state.clone(),
            Err(e) => {
                self.invalidate("load", &e);
                return Err(e);
            }
        };

        let record = ClickRecord::from_input(input, &self.limits, Utc::now());
        let new_count = next.push_click(record, self.limits.max_clicks);

        if let Err(e) = self.storage.save(&self.key, &next).await {
            self.invalidate("save", &e);
            return Err(e);
        }
        self.cached = Some(next);

        Ok(RecordClickResponse {
            ok: true,
            new_count,
        })
    }

    pub async fn get_stats(&mut self) -> Result<CounterStats> {
        let window = self.limits.stats_window;
        match self.load().await {
            Ok(state) => Ok(state.stats(window)),
            Err(e) => {
                self.invalidate("load", &e);
                Err(e)
            }
        }
    }

    pub async fn clear(&mut self) -> Result<ClearResponse> {
        if let Err(e) = self.storage.delete(&self.key).await {
            self.invalidate("clear", &e);
            return Err(e);
        }
        self.cached = Some(CounterState::default());
        Ok(ClearResponse {
            ok: true,
            cleared: true,
        })
    }

    pub async fn handle(&mut self, command: CounterCommand) -> Result<CounterReply> {
        match command {
            CounterCommand::RecordClick(input) => self.record_click(input).await.map(CounterReply::Clicked),
            CounterCommand::GetStats => self.get_stats().await.map(CounterReply::Stats),
            CounterCommand::Clear => self.clear().await.map(CounterReply::Cleared),
        }
    }
}
