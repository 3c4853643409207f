use crate::AppState;
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};

use super::ApiError;

/// GET /v1/s/:short
///
/// 1. Resolve the short code (cache first, then the database).
/// 2. Record the click. This write is part of the request: if it fails the
///    visitor gets an error rather than a silent gap in analytics.
/// 3. Return a 302 redirect to the original URL.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    // ── 1. Resolve URL ─────────────────────────────────────────────────────
    let original_url = match state.engine.resolve(&code).await {
        Ok(url) => url,
        Err(e) => return ApiError::from_link_error(e, "redirect").into_response(),
    };

    // ── 2. Track the click ─────────────────────────────────────────────────
    let ip = extract_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Err(e) = state.engine.track_click(&code, &ip, user_agent).await {
        return ApiError::from_link_error(e, "redirect").into_response();
    }

    // ── 3. Redirect ────────────────────────────────────────────────────────
    match HeaderValue::from_bytes(original_url.as_bytes()) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(e) => {
            tracing::error!("stored URL for '{}' is not a valid header: {}", code, e);
            ApiError::internal().into_response()
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Determine the real client IP, preferring common proxy headers.
fn extract_ip(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    // X-Forwarded-For can be a comma-separated list; take the first entry.
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = xff.split(',').next().map(str::trim) {
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_owned();
        }
    }

    addr.map(|a| a.ip().to_string()).unwrap_or_default()
}
