//! Admin Bearer token 鉴权
//!
//! token 未配置时整个 admin scope 返回 404；token 错误或缺失返回 401，
//! 请求不会到达 handler，因此不会触发任何计数读取。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{AUTHORIZATION, CONTENT_TYPE},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, trace};

use crate::errors::ClickLedgerError;
use crate::metrics_core::MetricsRecorder;

/// Admin authentication middleware
#[derive(Clone)]
pub struct AdminAuth {
    token: Arc<str>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl AdminAuth {
    pub fn new(token: impl Into<String>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            token: Arc::from(token.into()),
            metrics,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddleware {
            service: Rc::new(service),
            token: self.token.clone(),
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct AdminAuthMiddleware<S> {
    service: Rc<S>,
    token: Arc<str>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<S> AdminAuthMiddleware<S> {
    /// Handle requests when admin token is not configured
    fn handle_missing_token<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        debug!("Admin token not configured - returning 404");
        req.into_response(
            HttpResponse::NotFound()
                .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
                .body("Not Found")
                .map_into_right_body(),
        )
    }

    fn handle_unauthorized<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        let err = ClickLedgerError::unauthorized("Invalid or missing bearer token");
        req.into_response(
            actix_web::ResponseError::error_response(&err).map_into_right_body(),
        )
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<&str> {
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
    }
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let expected = self.token.clone();
        let metrics = self.metrics.clone();

        Box::pin(async move {
            if expected.is_empty() {
                return Ok(Self::handle_missing_token(req));
            }

            let authorized = Self::extract_bearer_token(&req)
                .map(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())));

            match authorized {
                Some(true) => {}
                Some(false) => {
                    metrics.inc_auth_failure("mismatch");
                    info!("Admin authentication failed: {}", req.path());
                    return Ok(Self::handle_unauthorized(req));
                }
                None => {
                    metrics.inc_auth_failure("missing");
                    info!("Admin request without bearer token: {}", req.path());
                    return Ok(Self::handle_unauthorized(req));
                }
            }

            trace!("Admin authentication succeeded");
            let res = srv.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
