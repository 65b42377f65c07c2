use actix_web::{HttpResponse, web};
use tracing::{error, info};

use crate::api::types::{FallbackCountResponse, validate_barcode};
use crate::errors::ClickLedgerError;
use crate::services::ClickCounterService;

pub struct AdminService;

impl AdminService {
    /// 读取持久计数；存储不可用时返回错误，不使用降级数据
    pub async fn get_stats(
        path: web::Path<String>,
        service: web::Data<ClickCounterService>,
    ) -> Result<HttpResponse, ClickLedgerError> {
        let barcode = path.into_inner();
        validate_barcode(&barcode)?;

        let stats = service.stats(&barcode).await.inspect_err(|e| {
            error!("Stats read for {} failed: {}", barcode, e);
        })?;
        Ok(HttpResponse::Ok().json(stats))
    }

    pub async fn clear(
        path: web::Path<String>,
        service: web::Data<ClickCounterService>,
    ) -> Result<HttpResponse, ClickLedgerError> {
        let barcode = path.into_inner();
        validate_barcode(&barcode)?;

        let resp = service.clear(&barcode).await?;
        info!("Admin cleared counter {}", barcode);
        Ok(HttpResponse::Ok().json(resp))
    }

    /// 降级存储中该 barcode 的计数
    pub async fn fallback_count(
        path: web::Path<String>,
        service: web::Data<ClickCounterService>,
    ) -> Result<HttpResponse, ClickLedgerError> {
        let barcode = path.into_inner();
        validate_barcode(&barcode)?;

        let count = service.fallback_count(&barcode).await?;
        Ok(HttpResponse::Ok().json(FallbackCountResponse { barcode, count }))
    }
}

pub fn admin_routes() -> actix_web::Scope {
    web::scope("/products")
        .route("/{barcode}/stats", web::get().to(AdminService::get_stats))
        .route("/{barcode}/clear", web::post().to(AdminService::clear))
        .route(
            "/{barcode}/fallback",
            web::get().to(AdminService::fallback_count),
        )
}
