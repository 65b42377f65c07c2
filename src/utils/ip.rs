//! IP 地址处理工具
//!
//! 点击记录里的 clientIp 只做尽力而为的记录，不参与鉴权，
//! 因此直接信任转发头，取不到时退回连接地址。

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

/// 无法确定客户端地址时写入的占位值
pub const UNKNOWN_IP: &str = "unknown";

/// 从 HttpRequest 提取客户端 IP
///
/// 顺序：X-Forwarded-For 第一跳 → X-Real-IP → 连接地址 → "unknown"
pub fn extract_client_ip(req: &HttpRequest) -> String {
    extract_forwarded_ip_from_headers(req.headers())
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// 从 HeaderMap 提取转发的 IP
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    // 优先 X-Forwarded-For（取第一个，即原始客户端 IP）
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            // 其次 X-Real-IP
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}
