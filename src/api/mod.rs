//! HTTP 接口层
//!
//! - `/api/affiliate/click`：公开的点击写入
//! - `{admin_prefix}/products/{barcode}/...`：Bearer 鉴权的统计 / 清理
//! - `{dev_prefix}/kv-clear`：仅在 `dev.enable_routes` 时挂载
//! - `{health_prefix}`：健康检查与指标

pub mod middleware;
pub mod services;
pub mod types;

use std::sync::Arc;

use actix_web::web;

use crate::config::StaticConfig;
use crate::errors::ClickLedgerError;
use crate::metrics_core::MetricsRecorder;
use middleware::AdminAuth;
use services::{admin_routes, affiliate_routes, dev_routes, health_routes};

/// 点击请求体上限
pub const JSON_PAYLOAD_LIMIT: usize = 16 * 1024;

/// JSON 解析失败统一返回 ValidationError（400）
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_PAYLOAD_LIMIT)
        .error_handler(|err, _req| {
            ClickLedgerError::validation(format!("Invalid JSON body: {}", err)).into()
        })
}

/// 路由挂载所需的配置快照
#[derive(Clone, Debug)]
pub struct RouteSettings {
    pub admin_token: String,
    pub admin_prefix: String,
    pub health_prefix: String,
    pub dev_prefix: String,
    pub enable_dev_routes: bool,
}

impl RouteSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        Self {
            admin_token: config.api.admin_token.clone(),
            admin_prefix: config.routes.admin_prefix.clone(),
            health_prefix: config.routes.health_prefix.clone(),
            dev_prefix: config.routes.dev_prefix.clone(),
            enable_dev_routes: config.dev.enable_routes,
        }
    }
}

/// 注册全部路由；共享状态（`ClickCounterService` 等）由调用方通过 `app_data` 注入
pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    settings: &RouteSettings,
    metrics: Arc<dyn MetricsRecorder>,
) {
    cfg.app_data(json_config())
        .service(
            web::scope(&settings.admin_prefix)
                .wrap(AdminAuth::new(settings.admin_token.clone(), metrics))
                .service(admin_routes()),
        )
        .service(web::scope(&settings.health_prefix).service(health_routes()));

    if settings.enable_dev_routes {
        cfg.service(web::scope(&settings.dev_prefix).service(dev_routes()));
    }

    cfg.service(affiliate_routes());
}
