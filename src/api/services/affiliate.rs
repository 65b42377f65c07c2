use actix_web::http::header::USER_AGENT;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::trace;

use crate::api::types::{ClickPayload, ClickResponse};
use crate::errors::ClickLedgerError;
use crate::services::ClickCounterService;
use crate::utils::ip::extract_client_ip;

pub struct AffiliateService;

impl AffiliateService {
    /// 记录一次联盟点击；合法请求总是返回 200
    pub async fn record_click(
        req: HttpRequest,
        payload: web::Json<ClickPayload>,
        service: web::Data<ClickCounterService>,
    ) -> Result<HttpResponse, ClickLedgerError> {
        let (barcode, mut input) = payload.into_inner().validate()?;

        input.client_ip = Some(extract_client_ip(&req));
        input.user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let outcome = service.record_click(&barcode, input).await;
        trace!(
            "Click recorded for {} (count={}, fallback={})",
            barcode, outcome.new_count, outcome.fallback
        );

        Ok(HttpResponse::Ok().json(ClickResponse::from(outcome)))
    }
}

pub fn affiliate_routes() -> actix_web::Scope {
    web::scope("/api/affiliate").route("/click", web::post().to(AffiliateService::record_click))
}
