//! 每个 barcode 一个的点击计数对象
//!
//! - `object`：单 key 的状态机（读 → 改 → 整体写回）
//! - `actor`：邮箱 + 后台任务，保证同一 key 的操作串行执行
//! - `registry`：barcode → 计数对象的路由，首次访问时创建
//! - `protocol`：对象间的 HTTP 形态指令（POST /click、GET /stats、POST /clear）

pub mod actor;
pub mod object;
pub mod protocol;
pub mod registry;

use std::collections::VecDeque;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CounterConfig;
use crate::utils::truncate_chars;

pub use actor::{CounterHandle, PendingReply};
pub use object::CounterObject;
pub use protocol::{ClearResponse, CounterCommand, CounterReply, RecordClickResponse};
pub use registry::CounterRegistry;

/// ClickRecord.source 的固定取值
pub const CLICK_SOURCE: &str = "affiliate";

/// 一次已落盘的联盟点击，写入后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    pub timestamp: String,
    pub offer_item_id: String,
    pub source: String,
    pub client_ip: String,
    pub user_agent: String,
    pub url_truncated: String,
}

/// RecordClick 的输入，字段名与 `POST /click` 的请求体一致
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickInput {
    pub offer_item_id: String,
    #[serde(default)]
    pub affiliate_url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, rename = "ip")]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ClickInput {
    pub fn new(offer_item_id: impl Into<String>) -> Self {
        Self {
            offer_item_id: offer_item_id.into(),
            ..Default::default()
        }
    }
}

/// 单个计数对象持久化的全部状态
///
/// `count` 是生命周期总数，`clicks` 只是最近窗口（最新在前），两者一起写回。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: u64,
    pub clicks: VecDeque<ClickRecord>,
}

impl CounterState {
    /// 追加一条点击并返回新的 count，超出 `max_clicks` 的最旧记录被淘汰
    pub fn push_click(&mut self, record: ClickRecord, max_clicks: usize) -> u64 {
        self.count = self.count.saturating_add(1);
        self.clicks.push_front(record);
        self.clicks.truncate(max_clicks);
        self.count
    }

    pub fn stats(&self, window: usize) -> CounterStats {
        CounterStats {
            count: self.count,
            last_clicks: self.clicks.iter().take(window).cloned().collect(),
        }
    }
}

/// GetStats 的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterStats {
    pub count: u64,
    pub last_clicks: Vec<ClickRecord>,
}

/// 计数对象的尺寸限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterLimits {
    pub max_clicks: usize,
    pub stats_window: usize,
    pub url_max_chars: usize,
    pub user_agent_max_chars: usize,
    pub offer_item_max_chars: usize,
    pub client_ip_max_chars: usize,
}

impl Default for CounterLimits {
    fn default() -> Self {
        Self::from(&CounterConfig::default())
    }
}

impl From<&CounterConfig> for CounterLimits {
    fn from(config: &CounterConfig) -> Self {
        Self {
            max_clicks: config.max_clicks,
            stats_window: config.stats_window,
            url_max_chars: config.url_max_chars,
            user_agent_max_chars: config.user_agent_max_chars,
            offer_item_max_chars: config.offer_item_max_chars,
            client_ip_max_chars: config.client_ip_max_chars,
        }
    }
}

impl ClickRecord {
    /// 由输入构造记录：截断所有客户端可控字段，补齐时间戳与 IP
    pub fn from_input(input: ClickInput, limits: &CounterLimits, now: DateTime<Utc>) -> Self {
        let client_ip = match input.client_ip.as_deref() {
            Some(ip) if !ip.is_empty() => truncate_chars(ip, limits.client_ip_max_chars),
            _ => crate::utils::ip::UNKNOWN_IP.to_string(),
        };
        Self {
            timestamp: normalize_timestamp(input.timestamp.as_deref(), now),
            offer_item_id: truncate_chars(&input.offer_item_id, limits.offer_item_max_chars),
            source: CLICK_SOURCE.to_string(),
            client_ip,
            user_agent: truncate_chars(
                input.user_agent.as_deref().unwrap_or_default(),
                limits.user_agent_max_chars,
            ),
            url_truncated: truncate_chars(
                input.affiliate_url.as_deref().unwrap_or_default(),
                limits.url_max_chars,
            ),
        }
    }
}

/// 客户端时间戳按 RFC 3339 解析并统一成 UTC 毫秒格式；缺失或无法解析时用服务器时间
fn normalize_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let parsed = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                debug!("Ignoring unparsable click timestamp '{}': {}", s, e);
                None
            }
        });
    parsed
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
