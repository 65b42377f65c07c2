//! HTTP 请求 / 响应类型

use serde::{Deserialize, Serialize};

use crate::counter::ClickInput;
use crate::errors::{ClickLedgerError, Result};
use crate::services::ClickOutcome;
use crate::utils::{MAX_BARCODE_LEN, is_valid_barcode};

/// `POST /api/affiliate/click` 请求体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickPayload {
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub offer_item_id: Option<String>,
    #[serde(default)]
    pub affiliate_url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ClickPayload {
    /// 校验后拆成路由 key 与计数输入（IP / UA 由调用方从请求头补齐）
    pub fn validate(self) -> Result<(String, ClickInput)> {
        let barcode = self
            .barcode
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ClickLedgerError::validation("barcode is required"))?;
        validate_barcode(&barcode)?;

        let offer_item_id = self
            .offer_item_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ClickLedgerError::validation("offerItemId is required"))?;

        let input = ClickInput {
            offer_item_id,
            affiliate_url: self.affiliate_url,
            timestamp: self.timestamp,
            client_ip: None,
            user_agent: None,
        };
        Ok((barcode, input))
    }
}

pub fn validate_barcode(barcode: &str) -> Result<()> {
    if is_valid_barcode(barcode) {
        Ok(())
    } else {
        Err(ClickLedgerError::validation(format!(
            "barcode must be 1-{} characters of [A-Za-z0-9_.-]",
            MAX_BARCODE_LEN
        )))
    }
}

/// `{ok, newCount, fallback?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickResponse {
    pub ok: bool,
    pub new_count: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl From<ClickOutcome> for ClickResponse {
    fn from(outcome: ClickOutcome) -> Self {
        Self {
            ok: true,
            new_count: outcome.new_count,
            fallback: outcome.fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackCountResponse {
    pub barcode: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvClearResponse {
    pub ok: bool,
    pub cleared: bool,
    pub removed: u64,
}

// ============ Health ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentCheck {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub durable: ComponentCheck,
    pub fallback: ComponentCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub live_counters: usize,
    pub checks: HealthChecks,
    pub response_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(barcode: Option<&str>, offer: Option<&str>) -> ClickPayload {
        ClickPayload {
            barcode: barcode.map(String::from),
            offer_item_id: offer.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_barcode_and_offer() {
        assert!(matches!(
            payload(None, Some("offer-1")).validate(),
            Err(ClickLedgerError::Validation(_))
        ));
        assert!(matches!(
            payload(Some("TESTAFF123"), None).validate(),
            Err(ClickLedgerError::Validation(_))
        ));
        assert!(matches!(
            payload(Some("TESTAFF123"), Some("   ")).validate(),
            Err(ClickLedgerError::Validation(_))
        ));
        assert!(matches!(
            payload(Some("bad/key"), Some("offer-1")).validate(),
            Err(ClickLedgerError::Validation(_))
        ));

        let (barcode, input) = payload(Some(" TESTAFF123 "), Some("offer-1"))
            .validate()
            .unwrap();
        assert_eq!(barcode, "TESTAFF123");
        assert_eq!(input.offer_item_id, "offer-1");
    }

    #[test]
    fn test_click_response_hides_fallback_flag_on_durable_path() {
        let json = serde_json::to_value(ClickResponse::from(ClickOutcome {
            new_count: 3,
            fallback: false,
        }))
        .unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "newCount": 3}));

        let json = serde_json::to_value(ClickResponse::from(ClickOutcome {
            new_count: 1,
            fallback: true,
        }))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ok": true, "newCount": 1, "fallback": true})
        );
    }
}
