//! HTTP API integration tests
//!
//! 点击入口、admin 统计 / 清理、dev 路由与降级路径。

mod common;

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use clickledger::api::configure_routes;
use clickledger::api::services::AppStartTime;
use clickledger::fallback::{FallbackStore, MemoryFallbackStore};
use clickledger::metrics_core::NoopMetrics;
use clickledger::services::ClickCounterService;
use clickledger::storage::MemoryCounterStorage;

use common::{
    ADMIN_TOKEN, CountingStorage, FailingStorage, SlowStorage, build_service, memory_service,
    route_settings,
};

macro_rules! init_app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($service.clone()))
                .app_data(web::Data::new(AppStartTime::now()))
                .configure(|cfg| configure_routes(cfg, &route_settings(), NoopMetrics::arc())),
        )
        .await
    };
}

fn click(barcode: &str, offer: &str) -> Value {
    json!({
        "barcode": barcode,
        "offerItemId": offer,
        "affiliateUrl": format!("https://shop.example/item/{}", offer),
        "timestamp": "2026-10-16T09:30:00.000Z"
    })
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

// =============================================================================
// Click endpoint
// =============================================================================

#[actix_web::test]
async fn test_three_clicks_then_stats_newest_first() {
    let service = memory_service();
    let app = init_app!(service);

    for (i, offer) in ["offer-1", "offer-2", "offer-3"].iter().enumerate() {
        let req = TestRequest::post()
            .uri("/api/affiliate/click")
            .insert_header(("User-Agent", "integration-test"))
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .set_json(click("TESTAFF123", offer))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ok": true, "newCount": i + 1}));
    }

    let req = TestRequest::get()
        .uri("/admin/products/TESTAFF123/stats")
        .insert_header(bearer(ADMIN_TOKEN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["count"], 3);
    let clicks = body["lastClicks"].as_array().unwrap();
    assert_eq!(clicks.len(), 3);
    assert_eq!(clicks[0]["offerItemId"], "offer-3");
    assert_eq!(clicks[2]["offerItemId"], "offer-1");
    assert_eq!(clicks[0]["source"], "affiliate");
    assert_eq!(clicks[0]["clientIp"], "203.0.113.7");
    assert_eq!(clicks[0]["userAgent"], "integration-test");
    assert_eq!(clicks[0]["timestamp"], "2026-10-16T09:30:00.000Z");
    assert_eq!(clicks[0]["urlTruncated"], "https://shop.example/item/offer-3");
}

#[actix_web::test]
async fn test_missing_offer_item_id_is_rejected_before_routing() {
    let storage = Arc::new(CountingStorage::default());
    let service = build_service(
        storage.clone(),
        Arc::new(MemoryFallbackStore::new()),
        Duration::from_secs(2),
    );
    let app = init_app!(service);

    let req = TestRequest::post()
        .uri("/api/affiliate/click")
        .set_json(json!({"barcode": "TESTAFF123", "affiliateUrl": "https://x.example"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], false);

    assert_eq!(storage.loads(), 0);
    assert_eq!(service.registry().live_count(), 0);
}

#[actix_web::test]
async fn test_invalid_payloads_are_client_errors() {
    let service = memory_service();
    let app = init_app!(service);

    for payload in [
        json!({"offerItemId": "offer-1"}),
        json!({"barcode": "", "offerItemId": "offer-1"}),
        json!({"barcode": "has/slash", "offerItemId": "offer-1"}),
    ] {
        let req = TestRequest::post()
            .uri("/api/affiliate/click")
            .set_json(payload.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", payload);
    }

    let req = TestRequest::post()
        .uri("/api/affiliate/click")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_long_url_and_user_agent_are_truncated() {
    let service = memory_service();
    let app = init_app!(service);

    let req = TestRequest::post()
        .uri("/api/affiliate/click")
        .insert_header(("User-Agent", "U".repeat(300)))
        .set_json(json!({
            "barcode": "TRUNC",
            "offerItemId": "offer-1",
            "affiliateUrl": format!("https://shop.example/?q={}", "x".repeat(1000)),
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let stats = service.stats("TRUNC").await.unwrap();
    let record = &stats.last_clicks[0];
    assert_eq!(record.url_truncated.chars().count(), 256);
    assert_eq!(record.user_agent.chars().count(), 100);
}

// =============================================================================
// Fallback path
// =============================================================================

#[actix_web::test]
async fn test_durable_failure_falls_back_and_increments_kv() {
    let fallback = Arc::new(MemoryFallbackStore::new());
    let service = build_service(
        Arc::new(FailingStorage),
        fallback.clone(),
        Duration::from_secs(2),
    );
    let app = init_app!(service);

    let before = fallback.get("FALLBACK_TEST").await.unwrap();

    let req = TestRequest::post()
        .uri("/api/affiliate/click")
        .set_json(click("FALLBACK_TEST", "offer-1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["ok"], true);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["newCount"], before + 1);
    assert_eq!(fallback.get("FALLBACK_TEST").await.unwrap(), before + 1);

    // stats 没有降级模式
    let req = TestRequest::get()
        .uri("/admin/products/FALLBACK_TEST/stats")
        .insert_header(bearer(ADMIN_TOKEN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let req = TestRequest::get()
        .uri("/admin/products/FALLBACK_TEST/fallback")
        .insert_header(bearer(ADMIN_TOKEN))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"barcode": "FALLBACK_TEST", "count": before + 1}));
}

#[actix_web::test]
async fn test_durable_timeout_falls_back() {
    let fallback = Arc::new(MemoryFallbackStore::new());
    let service = build_service(
        Arc::new(SlowStorage::new(Duration::from_millis(500))),
        fallback.clone(),
        Duration::from_millis(50),
    );
    let app = init_app!(service);

    let req = TestRequest::post()
        .uri("/api/affiliate/click")
        .set_json(click("SLOW", "offer-1"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ok": true, "newCount": 1, "fallback": true}));
    assert_eq!(fallback.get("SLOW").await.unwrap(), 1);
}

// =============================================================================
// Admin auth
// =============================================================================

#[actix_web::test]
async fn test_wrong_secret_is_rejected_without_reading() {
    let storage = Arc::new(CountingStorage::default());
    let service = build_service(
        storage.clone(),
        Arc::new(MemoryFallbackStore::new()),
        Duration::from_secs(2),
    );
    let app = init_app!(service);

    let req = TestRequest::get()
        .uri("/admin/products/TESTAFF123/stats")
        .insert_header(bearer("wrong-secret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::get()
        .uri("/admin/products/TESTAFF123/stats")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::post()
        .uri("/admin/products/TESTAFF123/clear")
        .insert_header(("Authorization", ADMIN_TOKEN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(storage.loads(), 0);
    assert_eq!(service.registry().live_count(), 0);
}

#[actix_web::test]
async fn test_admin_scope_hidden_without_token() {
    let service = memory_service();
    let mut settings = route_settings();
    settings.admin_token.clear();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::from(service.clone()))
            .configure(|cfg| configure_routes(cfg, &settings, NoopMetrics::arc())),
    )
    .await;

    let req = TestRequest::get()
        .uri("/admin/products/TESTAFF123/stats")
        .insert_header(bearer(""))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_admin_clear() {
    let service = memory_service();
    let app = init_app!(service);

    for offer in ["offer-1", "offer-2"] {
        let req = TestRequest::post()
            .uri("/api/affiliate/click")
            .set_json(click("CLEARME", offer))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = TestRequest::post()
        .uri("/admin/products/CLEARME/clear")
        .insert_header(bearer(ADMIN_TOKEN))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ok": true, "cleared": true}));

    let req = TestRequest::get()
        .uri("/admin/products/CLEARME/stats")
        .insert_header(bearer(ADMIN_TOKEN))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"count": 0, "lastClicks": []}));
}

// =============================================================================
// Dev routes
// =============================================================================

#[actix_web::test]
async fn test_dev_kv_clear() {
    let fallback = Arc::new(MemoryFallbackStore::new());
    fallback.increment("A").await.unwrap();
    fallback.increment("B").await.unwrap();
    let service: Arc<ClickCounterService> = build_service(
        Arc::new(MemoryCounterStorage::new()),
        fallback.clone(),
        Duration::from_secs(2),
    );
    let app = init_app!(service);

    let req = TestRequest::post().uri("/dev/kv-clear").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ok": true, "cleared": true, "removed": 2}));
    assert_eq!(fallback.get("A").await.unwrap(), 0);
}

#[actix_web::test]
async fn test_dev_routes_not_mounted_by_default() {
    let service = memory_service();
    let mut settings = route_settings();
    settings.enable_dev_routes = false;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::from(service.clone()))
            .configure(|cfg| configure_routes(cfg, &settings, NoopMetrics::arc())),
    )
    .await;

    let req = TestRequest::post().uri("/dev/kv-clear").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Health
// =============================================================================

#[actix_web::test]
async fn test_health_reports_durable_status() {
    let service = memory_service();
    let app = init_app!(service);

    let req = TestRequest::get().uri("/health/live").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["durable"]["backend"], "memory");

    let broken = build_service(
        Arc::new(FailingStorage),
        Arc::new(MemoryFallbackStore::new()),
        Duration::from_secs(2),
    );
    let app = init_app!(broken);
    let req = TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
