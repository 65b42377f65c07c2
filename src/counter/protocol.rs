//! 路由器与计数对象之间的 HTTP 形态指令
//!
//! | Method | Path     | Body          | Reply              |
//! |--------|----------|---------------|--------------------|
//! | POST   | `/click` | `ClickInput`  | `{ok, newCount}`   |
//! | GET    | `/stats` | -             | `{count, lastClicks}` |
//! | POST   | `/clear` | -             | `{ok, cleared}`    |
//!
//! 其他组合一律 NotFound。

use actix_web::http::Method;
use serde::{Deserialize, Serialize};

use super::{ClickInput, CounterStats};
use crate::errors::{ClickLedgerError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterCommand {
    RecordClick(ClickInput),
    GetStats,
    Clear,
}

impl CounterCommand {
    /// 按 method + path 解析指令
    pub fn from_request(method: &Method, path: &str, body: &[u8]) -> Result<Self> {
        match (method, path) {
            (&Method::POST, "/click") => {
                let input: ClickInput = serde_json::from_slice(body).map_err(|e| {
                    ClickLedgerError::validation(format!("Invalid click body: {}", e))
                })?;
                if input.offer_item_id.trim().is_empty() {
                    return Err(ClickLedgerError::validation("offerItemId is required"));
                }
                Ok(CounterCommand::RecordClick(input))
            }
            (&Method::GET, "/stats") => Ok(CounterCommand::GetStats),
            (&Method::POST, "/clear") => Ok(CounterCommand::Clear),
            _ => Err(ClickLedgerError::not_found(format!(
                "No counter route for {} {}",
                method, path
            ))),
        }
    }

    /// 指标与日志使用的操作名
    pub fn operation(&self) -> &'static str {
        match self {
            CounterCommand::RecordClick(_) => "click",
            CounterCommand::GetStats => "stats",
            CounterCommand::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordClickResponse {
    pub ok: bool,
    pub new_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub ok: bool,
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterReply {
    Clicked(RecordClickResponse),
    Stats(CounterStats),
    Cleared(ClearResponse),
}

impl CounterReply {
    pub fn into_json(self) -> Result<serde_json::Value> {
        let value = match self {
            CounterReply::Clicked(r) => serde_json::to_value(r)?,
            CounterReply::Stats(s) => serde_json::to_value(s)?,
            CounterReply::Cleared(c) => serde_json::to_value(c)?,
        };
        Ok(value)
    }

    fn kind(&self) -> &'static str {
        match self {
            CounterReply::Clicked(_) => "click",
            CounterReply::Stats(_) => "stats",
            CounterReply::Cleared(_) => "clear",
        }
    }

    pub(crate) fn unexpected(self, wanted: &str) -> ClickLedgerError {
        ClickLedgerError::storage(format!(
            "Counter replied with '{}' to a '{}' command",
            self.kind(),
            wanted
        ))
    }
}
