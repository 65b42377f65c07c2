use actix_web::{HttpResponse, web};
use tracing::warn;

use crate::api::types::KvClearResponse;
use crate::errors::ClickLedgerError;
use crate::services::ClickCounterService;

pub struct DevService;

impl DevService {
    /// 清空降级存储（本地 / 测试环境）
    pub async fn kv_clear(
        service: web::Data<ClickCounterService>,
    ) -> Result<HttpResponse, ClickLedgerError> {
        let removed = service.clear_fallback().await?;
        warn!("Dev route cleared fallback store ({} keys)", removed);
        Ok(HttpResponse::Ok().json(KvClearResponse {
            ok: true,
            cleared: true,
            removed,
        }))
    }
}

pub fn dev_routes() -> actix_web::Scope {
    web::scope("").route("/kv-clear", web::post().to(DevService::kv_clear))
}
